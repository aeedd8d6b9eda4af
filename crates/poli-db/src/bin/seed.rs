//! # Seed Data Generator
//!
//! Populates a database with a small pizzeria for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./poli_dev.db
//! cargo run -p poli-db --bin seed
//!
//! # Specify database path
//! cargo run -p poli-db --bin seed -- --db ./data/poli.db
//! ```
//!
//! ## Generated Data
//! - Staff: one SYSADMIN, one ADMIN, one cashier
//! - Menu: pizzas (stock not tracked), drinks (tracked stock)
//! - Addons: extra cheese, bacon, olives...
//! - Ingredients with reorder thresholds
//!
//! Skips everything if the database already has products.

use poli_core::{
    Money, NewIngredient, NewProduct, NewProductAddon, NewUser, ProductStatus, Role,
};
use poli_db::{Database, DbConfig};
use std::env;

/// (name, description, price in guaraníes)
const PIZZAS: &[(&str, &str, i64)] = &[
    ("Muzzarella", "Salsa de tomate, muzzarella y orégano", 45_000),
    ("Napolitana", "Muzzarella, tomate en rodajas y ajo", 50_000),
    ("Calabresa", "Muzzarella y longaniza calabresa", 55_000),
    ("Fugazzeta", "Muzzarella y cebolla", 48_000),
    ("Cuatro Quesos", "Muzzarella, parmesano, roquefort y provolone", 60_000),
    ("Pollo con Catupiry", "Pollo desmenuzado y catupiry", 58_000),
    ("Jamón y Morrón", "Jamón cocido y morrones asados", 52_000),
];

/// (name, price, initial stock)
const DRINKS: &[(&str, i64, i64)] = &[
    ("Coca-Cola 1.5L", 15_000, 24),
    ("Coca-Cola 500ml", 8_000, 48),
    ("Agua mineral 500ml", 5_000, 48),
    ("Cerveza Pilsen 1L", 14_000, 36),
];

const ADDONS: &[(&str, i64)] = &[
    ("Extra muzzarella", 8_000),
    ("Panceta", 9_000),
    ("Aceitunas", 4_000),
    ("Huevo", 3_000),
];

/// (name, unit, stock, min stock, cost per unit)
const INGREDIENTS: &[(&str, &str, f64, f64, i64)] = &[
    ("Harina 000", "kg", 50.0, 10.0, 6_500),
    ("Muzzarella", "kg", 20.0, 5.0, 48_000),
    ("Salsa de tomate", "l", 15.0, 4.0, 12_000),
    ("Cebolla", "kg", 8.0, 3.0, 7_000),
    ("Longaniza calabresa", "kg", 4.0, 2.0, 55_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./poli_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Poli POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./poli_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Poli POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Creating staff...");
    for (username, name, last_name, role) in [
        ("admin", "Sofía", "Martínez", Role::Sysadmin),
        ("encargado", "Diego", "Ramírez", Role::Admin),
        ("cajero", "Lucía", "Giménez", Role::User),
    ] {
        let user = db
            .users()
            .create(NewUser {
                username: username.to_string(),
                name: name.to_string(),
                last_name: last_name.to_string(),
                role,
            })
            .await?;
        println!("  {} ({}) → {}", user.username, user.role, user.id);
    }

    println!("Creating menu...");
    for (name, description, price) in PIZZAS {
        db.products()
            .create(NewProduct {
                name: name.to_string(),
                description: Some(description.to_string()),
                price: Money::new(*price),
                category: "Pizzas".to_string(),
                status: ProductStatus::Active,
                stock: None,
            })
            .await?;
    }
    for (name, price, stock) in DRINKS {
        db.products()
            .create(NewProduct {
                name: name.to_string(),
                description: None,
                price: Money::new(*price),
                category: "Bebidas".to_string(),
                status: ProductStatus::Active,
                stock: Some(*stock),
            })
            .await?;
    }
    println!("  {} products", PIZZAS.len() + DRINKS.len());

    for (name, price) in ADDONS {
        db.products()
            .create_addon(NewProductAddon {
                name: name.to_string(),
                price: Money::new(*price),
            })
            .await?;
    }
    println!("  {} addons", ADDONS.len());

    println!("Creating inventory...");
    for (name, unit, stock, min_stock, cost) in INGREDIENTS {
        db.ingredients()
            .create(NewIngredient {
                name: name.to_string(),
                description: None,
                unit: unit.to_string(),
                current_stock: *stock,
                min_stock: *min_stock,
                cost: Money::new(*cost),
            })
            .await?;
    }
    println!("  {} ingredients", INGREDIENTS.len());

    db.system_config().get().await?;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
