//! # Seed
//!
//! Out-of-band provisioning for a fresh deployment: applies the schema,
//! creates the default categories and installs the single owner.
//! Safe to run repeatedly.

mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use configs::Settings;
use services::{CategorySpec, ProvisioningService};
use storage_adapters::SqliteForumStore;

fn default_categories() -> Vec<CategorySpec> {
    [
        ("Announcements", "News and rules from the staff", "📢"),
        ("General", "Anything that fits nowhere else", "💬"),
        ("Help", "Questions about the forum itself", "🛟"),
        ("Off-topic", "Everything else", "🎲"),
    ]
    .into_iter()
    .enumerate()
    .map(|(position, (name, description, icon))| CategorySpec {
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        position: position as i32,
    })
    .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    telemetry::init(&settings.log);

    let db = &settings.database;
    let store = Arc::new(
        SqliteForumStore::connect(&db.url, db.max_connections, db.acquire_timeout())
            .await
            .context("connecting to the database")?,
    );
    store.migrate().await.context("applying migrations")?;

    let provisioning = ProvisioningService::new(store.clone(), store.clone());
    for spec in default_categories() {
        provisioning.provision_category(spec).await?;
    }

    match &settings.seed {
        Some(seed) => {
            let owner = provisioning
                .provision_owner(seed.owner_id, &seed.owner_display_name)
                .await
                .context("provisioning the owner")?;
            tracing::info!(
                display_id = owner.display_id,
                role = owner.role.label(),
                "owner ready"
            );
        }
        None => tracing::warn!("no [seed] section configured; owner not provisioned"),
    }

    store.pool().close().await;
    tracing::info!("seed complete");
    Ok(())
}
