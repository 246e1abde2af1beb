//! Database seeder for Radbill development and testing.
//!
//! Seeds priced groups, clients on every subscription model, and their group
//! memberships so a local sweep has something to invoice. Safe to run twice.
//!
//! Usage: cargo run --bin seeder

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use radbill_db::entities::{clients, groups, rad_user_group};

/// Group name and price in cents. `None` is an unpriced group.
const GROUPS: [(&str, Option<i64>); 4] = [
    ("fiber-20", Some(2000)),
    ("fiber-50", Some(3500)),
    ("static-ip", Some(500)),
    ("staff", None),
];

/// Username, phone, subscription model and status.
const CLIENTS: [(&str, &str, Option<&str>, &str); 5] = [
    ("alice", "+96170000001", Some("MONTHLY"), "ACTIVE"),
    ("bob", "+96170000002", Some("QUARTERLY"), "ACTIVE"),
    ("carol", "+96170000003", Some("YEARLY"), "ACTIVE"),
    ("dave", "+96170000004", Some("MONTHLY"), "SUSPENDED"),
    ("erin", "+96170000005", None, "ACTIVE"),
];

const MEMBERSHIPS: [(&str, &str); 6] = [
    ("alice", "fiber-20"),
    ("alice", "static-ip"),
    ("bob", "fiber-50"),
    ("carol", "fiber-50"),
    ("carol", "staff"),
    ("dave", "fiber-20"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set in environment"))?;

    println!("Connecting to database...");
    let db = radbill_db::connect(&database_url).await?;

    println!("Seeding groups...");
    seed_groups(&db).await?;

    println!("Seeding clients...");
    seed_clients(&db).await?;

    println!("Seeding group memberships...");
    seed_memberships(&db).await?;

    println!("Seeding complete!");
    Ok(())
}

async fn seed_groups(db: &DatabaseConnection) -> anyhow::Result<()> {
    for (name, cents) in GROUPS {
        let exists = groups::Entity::find()
            .filter(groups::Column::Name.eq(name))
            .one(db)
            .await?
            .is_some();
        if exists {
            println!("  Group {name} already exists, skipping...");
            continue;
        }

        groups::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name.to_string()),
            price: Set(cents.map(|c| Decimal::new(c, 2))),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
        println!("  Created group {name}");
    }
    Ok(())
}

async fn seed_clients(db: &DatabaseConnection) -> anyhow::Result<()> {
    for (username, phone, model, status) in CLIENTS {
        let exists = clients::Entity::find()
            .filter(clients::Column::Username.eq(username))
            .one(db)
            .await?
            .is_some();
        if exists {
            println!("  Client {username} already exists, skipping...");
            continue;
        }

        clients::ActiveModel {
            id: Set(Uuid::now_v7()),
            username: Set(username.to_string()),
            phone_number: Set(Some(phone.to_string())),
            subscription_model: Set(model.map(str::to_string)),
            status: Set(status.to_string()),
            created_at: Set(Utc::now().into()),
            updated_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
        println!("  Created client {username}");
    }
    Ok(())
}

async fn seed_memberships(db: &DatabaseConnection) -> anyhow::Result<()> {
    let mut inserted = 0;

    for (username, group_name) in MEMBERSHIPS {
        let exists = rad_user_group::Entity::find()
            .filter(rad_user_group::Column::Username.eq(username))
            .filter(rad_user_group::Column::GroupName.eq(group_name))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }

        rad_user_group::ActiveModel {
            id: Set(Uuid::now_v7()),
            username: Set(username.to_string()),
            group_name: Set(group_name.to_string()),
            priority: Set(1),
        }
        .insert(db)
        .await?;
        inserted += 1;
    }

    println!("  Created {inserted} memberships");
    Ok(())
}
