//! CRM Server: connect to the store, migrate and seed the permission catalog.

mod config;

use anyhow::{Context, Result};
use crm_db::DbManager;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("crm=info".parse().context("log directive")?),
        )
        .json()
        .init();

    tracing::info!("Starting CRM server...");

    let config = ServerConfig::from_env()?;

    let manager = DbManager::connect(&config.db)
        .await
        .context("connect to CRM store")?;
    let prepared = manager.prepare().await.context("prepare CRM store")?;

    tracing::info!(
        seeded_permissions = prepared.seeded_permissions,
        gate_bypass = config.access.super_admin_bypasses_gate,
        scope_bypass = config.access.super_admin_bypasses_scope,
        peppered = config.access.pepper.is_some(),
        min_password_length = config.access.min_password_length,
        "CRM access core ready"
    );

    tracing::info!("CRM server stopped.");
    Ok(())
}
