use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Ident, LitStr, Result, Token, Visibility, braced, token};

use proc_macro_crate::{FoundCrate, crate_name};

/// Child name reserved by the runtime for "this node".
const ROOT_ALIAS: &str = "root";

/// Attributes accepted on the tree and on nodes.
#[derive(Clone, Default)]
struct NodeAttrs {
    /// `#[name = "sign-in"]` on nodes, `#[id = "app"]` on the tree.
    rename: Option<LitStr>,
    /// Doc comments, forwarded to the generated module.
    docs: Vec<LitStr>,
}

struct Node {
    ident: Ident,
    attrs: NodeAttrs,
    children: Vec<Node>,
}

impl Node {
    /// Runtime child name: the `#[name]` override or the identifier.
    fn name(&self) -> String {
        match &self.attrs.rename {
            Some(lit) => lit.value(),
            None => self.ident.to_string(),
        }
    }

    fn name_span(&self) -> Span {
        match &self.attrs.rename {
            Some(lit) => lit.span(),
            None => self.ident.span(),
        }
    }
}

struct LocatorsInput {
    attrs: NodeAttrs,
    vis: Visibility,
    root: Ident,
    nodes: Vec<Node>,
}

impl LocatorsInput {
    fn id(&self) -> String {
        match &self.attrs.rename {
            Some(lit) => lit.value(),
            None => self.root.to_string(),
        }
    }
}

impl Parse for LocatorsInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let attrs = parse_attrs(input, "id")?;
        let vis: Visibility = input.parse()?;
        input.parse::<Token![mod]>()?;
        let root: Ident = input.parse()?;
        let content;
        braced!(content in input);
        let nodes = parse_nodes(&content)?;
        Ok(Self {
            attrs,
            vis,
            root,
            nodes,
        })
    }
}

fn parse_nodes(input: ParseStream) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    while !input.is_empty() {
        let attrs = parse_attrs(input, "name")?;
        let ident: Ident = input.parse()?;

        let children = if input.peek(token::Brace) {
            let content;
            braced!(content in input);
            parse_nodes(&content)?
        } else {
            input.parse::<Token![;]>()?;
            Vec::new()
        };
        nodes.push(Node {
            ident,
            attrs,
            children,
        });
    }
    Ok(nodes)
}

/// Parse `#[doc = "..."]` and `#[<rename_key> = "..."]`; anything else is an error.
fn parse_attrs(input: ParseStream, rename_key: &str) -> Result<NodeAttrs> {
    let mut result = NodeAttrs::default();

    while input.peek(Token![#]) {
        input.parse::<Token![#]>()?;
        let content;
        syn::bracketed!(content in input);

        let key: Ident = content.parse()?;
        content.parse::<Token![=]>()?;
        let value: LitStr = content.parse()?;

        if key == "doc" {
            result.docs.push(value);
        } else if key == rename_key {
            if result.rename.is_some() {
                return Err(syn::Error::new(key.span(), format!("duplicate #[{rename_key}]")));
            }
            result.rename = Some(value);
        } else {
            return Err(syn::Error::new(
                key.span(),
                format!("unknown attribute `{key}`, expected `{rename_key}`"),
            ));
        }
    }

    Ok(result)
}

// =============================================================================
// Validation (runs at macro expansion time)
// =============================================================================

/// Reject names the runtime registry would refuse, with spans.
fn validate(input: &LocatorsInput) -> Result<()> {
    let mut errors = Vec::new();

    if input.id().is_empty() {
        let span = input
            .attrs
            .rename
            .as_ref()
            .map_or_else(|| input.root.span(), LitStr::span);
        errors.push(syn::Error::new(span, "locator id must be non-empty"));
    }
    validate_siblings(&input.nodes, &mut errors);

    let mut errors = errors.into_iter();
    match errors.next() {
        Some(mut first) => {
            first.extend(errors);
            Err(first)
        }
        None => Ok(()),
    }
}

fn validate_siblings(nodes: &[Node], errors: &mut Vec<syn::Error>) {
    for (i, node) in nodes.iter().enumerate() {
        let name = node.name();
        if name.is_empty() {
            errors.push(syn::Error::new(node.name_span(), "child name must be non-empty"));
        } else if name == ROOT_ALIAS {
            errors.push(syn::Error::new(
                node.name_span(),
                format!("`{ROOT_ALIAS}` is reserved: it refers to the parent node itself"),
            ));
        }

        for earlier in &nodes[..i] {
            if earlier.name() == name {
                errors.push(syn::Error::new(
                    node.name_span(),
                    format!("duplicate locator child `{name}`"),
                ));
            } else if earlier.ident == node.ident {
                errors.push(syn::Error::new(
                    node.ident.span(),
                    format!("duplicate module name `{}`", node.ident),
                ));
            }
        }

        validate_siblings(&node.children, errors);
    }
}

// =============================================================================
// Tree analysis
// =============================================================================

/// Levels below the root (0 for a childless tree).
fn depth(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|n| 1 + depth(&n.children))
        .max()
        .unwrap_or(0)
}

fn count(nodes: &[Node]) -> usize {
    nodes.iter().map(|n| 1 + count(&n.children)).sum()
}

// =============================================================================
// Crate path resolution
// =============================================================================

fn runtime_crate_path() -> TokenStream2 {
    match crate_name("locator-tree") {
        Ok(FoundCrate::Itself) => quote!(::locator_tree),
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::locator_tree),
    }
}

// =============================================================================
// Code generation
// =============================================================================

/// Nested `LocatorDef` literals mirroring the declared tree.
///
/// Struct literals rather than `const fn` calls, so every nested slice is
/// promoted to `'static`.
fn generate_defs(nodes: &[Node], lt: &TokenStream2) -> Vec<TokenStream2> {
    nodes
        .iter()
        .map(|node| {
            let name = LitStr::new(&node.name(), node.name_span());
            let children = generate_defs(&node.children, lt);
            quote! {
                #lt::LocatorDef {
                    name: #name,
                    children: &[#(#children),*],
                }
            }
        })
        .collect()
}

/// One module per node, nested like the tree.
///
/// ```ignore
/// locators! {
///     pub mod App {
///         header { nav; }
///         #[name = "sign-in"]
///         SignIn;
///     }
/// }
///
/// // Generates:
/// pub mod App {
///     pub const ID: &str = "App";
///     pub const DEFINITIONS: &[LocatorDef] = &[...];
///     pub fn register(registry: &LocatorRegistry) -> Result<Locator, LocatorError>;
///
///     pub mod header {
///         pub const NAME: &str = "header";
///         pub const SEGMENTS: &[&str] = &["header"];
///         pub fn locator(root: &Locator) -> Locator;
///
///         pub mod nav { /* SEGMENTS = ["header", "nav"] */ }
///     }
///     pub mod SignIn { /* NAME = "sign-in" */ }
/// }
/// ```
fn generate_nodes(nodes: &[Node], prefix: &[String], lt: &TokenStream2) -> Vec<TokenStream2> {
    let mut output = Vec::new();

    for node in nodes {
        let ident = &node.ident;
        let docs = &node.attrs.docs;
        let name = node.name();
        let name_lit = LitStr::new(&name, node.name_span());

        let mut segments = prefix.to_vec();
        segments.push(name);
        let seg_lits: Vec<LitStr> = segments
            .iter()
            .map(|s| LitStr::new(s, Span::call_site()))
            .collect();

        let children = generate_nodes(&node.children, &segments, lt);

        output.push(quote! {
            #(#[doc = #docs])*
            #[allow(non_snake_case, non_camel_case_types)]
            pub mod #ident {
                /// Child name of this node under its parent.
                pub const NAME: &'static str = #name_lit;

                /// Child names from the tree root down to this node.
                pub const SEGMENTS: &'static [&'static str] = &[#(#seg_lits),*];

                /// This node of the tree rooted at `root`.
                pub fn locator(root: &#lt::Locator) -> #lt::Locator {
                    root.descend(SEGMENTS)
                }

                #(#children)*
            }
        });
    }

    output
}

fn expand(input: LocatorsInput, lt: &TokenStream2) -> Result<TokenStream2> {
    validate(&input)?;

    let id = LitStr::new(
        &input.id(),
        input
            .attrs
            .rename
            .as_ref()
            .map_or_else(|| input.root.span(), LitStr::span),
    );
    let tree_depth = 1 + depth(&input.nodes);
    let node_count = 1 + count(&input.nodes);
    let defs = generate_defs(&input.nodes, lt);
    let nodes = generate_nodes(&input.nodes, &[], lt);

    let docs = &input.attrs.docs;
    let vis = &input.vis;
    let root = &input.root;

    Ok(quote! {
        #(#[doc = #docs])*
        #[allow(non_snake_case, non_camel_case_types, dead_code)]
        #vis mod #root {
            /// Root locator id.
            pub const ID: &'static str = #id;

            /// Number of tree levels, the root included.
            pub const TREE_DEPTH: usize = #tree_depth;

            /// Total number of locator nodes, the root included.
            pub const NODE_COUNT: usize = #node_count;

            /// Declared children of the root (for the runtime registry).
            pub const DEFINITIONS: &'static [#lt::LocatorDef] = &[#(#defs),*];

            /// Register this tree and every declared child with `registry`.
            pub fn register(
                registry: &#lt::LocatorRegistry,
            ) -> ::core::result::Result<#lt::Locator, #lt::LocatorError> {
                registry.register(ID, DEFINITIONS)
            }

            /// A standalone tree, outside any registry.
            pub fn standalone(
                options: #lt::GlobalOptions,
            ) -> ::core::result::Result<#lt::Locator, #lt::LocatorError> {
                #lt::Locator::root(ID, options)
            }

            #(#nodes)*
        }
    })
}

// =============================================================================
// Entry point
// =============================================================================

/// Declare a locator tree.
///
/// ```ignore
/// locators! {
///     #[id = "app"]
///     pub mod App {
///         header { logo; nav; }
///         #[name = "sign-in"]
///         SignIn;
///     }
/// }
/// ```
///
/// Sibling names must be unique, non-empty, and never `root`.
#[proc_macro]
pub fn locators(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as LocatorsInput);
    let lt = runtime_crate_path();
    expand(input, &lt)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
