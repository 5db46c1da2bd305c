//! Combining selectors into unions and descendant chains.
//!
//! This example shows how to:
//! - Match any of several nodes with `find_any_of_selectors`
//! - Scope a selector under another with `find_chain_of_selectors`
//! - Let production builds collapse everything into the empty sentinel

use locator_tree::{
    GlobalOptions, Locator, Parameters, find_any_of_selectors, find_chain_of_selectors, locators,
};

locators! {
    #[id = "shop"]
    pub mod Shop {
        cart {
            item;
            total;
        }
        wishlist {
            item;
        }
    }
}

fn main() {
    println!("=== Selector Combinators ===\n");

    let shop = Shop::standalone(GlobalOptions::default().with_production(false)).unwrap();

    // 1. Union: any cart or wishlist item
    let cart_item = Shop::cart::item::locator(&shop).selector().unwrap();
    let wish_item = Shop::wishlist::item::locator(&shop).selector().unwrap();
    let items = find_any_of_selectors(&[cart_item, wish_item]).unwrap();
    println!("Any item:\n  {items}\n");

    // 2. Unions stay flat
    let total = Shop::cart::total::locator(&shop).selector().unwrap();
    let everything = find_any_of_selectors(&[items.clone(), total]).unwrap();
    println!("Any item or total ({} fragments):\n  {everything}\n", everything.fragments().len());

    // 3. Chain: a specific item inside the cart
    let cart = Shop::cart::locator(&shop).selector().unwrap();
    let sku = Shop::cart::item::locator(&shop)
        .selector_with(Parameters::from([("sku", "SKU-*")]))
        .unwrap();
    let scoped = find_chain_of_selectors(&[cart, sku]).unwrap();
    println!("Cart items with an SKU:\n  {scoped}\n");

    // 4. Production: every combination is the empty selector
    let prod = Shop::standalone(GlobalOptions::default().with_production(true)).unwrap();
    let empty = prod.selector().unwrap();
    let absorbed = find_any_of_selectors(&[items, empty]).unwrap();
    println!("Production union: {:?}", absorbed.css());
    println!("Production locator: {:?}", Locator::production());
}
