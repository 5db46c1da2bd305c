//! Declaring a locator tree, activating it, and rendering nodes.
//!
//! This example shows how to:
//! - Declare a tree with `locators!` and register it
//! - Activate the registry once the attribute names are known
//! - Render attribute maps and CSS selectors, with and without parameters

use locator_tree::{GlobalOptions, LocatorRegistry, Parameters, locators};

locators! {
    #[id = "app"]
    pub mod App {
        header {
            logo;
            nav {
                home;
                settings;
            }
        }
        table {
            row;
        }
        #[name = "sign-in"]
        SignIn;
    }
}

fn main() {
    println!("=== Basic Locator Tree ===\n");

    // 1. Register before any configuration is known
    let registry = LocatorRegistry::new();
    let app = App::register(&registry).unwrap();
    println!("Registered {} nodes (depth {})", registry.len(), App::TREE_DEPTH);
    println!(
        "  id before activation: {:?}\n",
        App::header::nav::locator(&app).id()
    );

    // 2. Activate with the application's conventions
    let options = GlobalOptions::default()
        .with_id_attribute("data-qa")
        .with_child_separator("__")
        .with_parameter_prefix("data-qa-");
    registry.activate(options).unwrap();

    // 3. Plain attributes
    let home = App::header::nav::home::locator(&app);
    println!("{}:", home);
    for (name, value) in home.attributes().unwrap().iter() {
        println!("  {name}={value:?}");
    }
    println!();

    // 4. Parameterized nodes
    let row = App::table::row::locator(&app);
    for index in 0..3 {
        let attrs = row.attributes_with(Parameters::from([("index", index)])).unwrap();
        println!("  row {index}: {}", serde_json::to_string(&*attrs).unwrap());
    }
    println!();

    // 5. Selectors, with wildcards
    let sel = row
        .selector_with(Parameters::from([("label", "Order *")]))
        .unwrap();
    println!("Selector for rows labelled 'Order ...':");
    println!("  {sel}\n");

    // 6. Nodes that were never declared still work
    let banner = app.descend(&["header", "banner"]);
    println!("Undeclared child: {}", banner);
    println!("Sign-in button: {}", App::SignIn::locator(&app));
}
