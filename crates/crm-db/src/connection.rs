//! Store handle: connect, then bring the schema and permission catalog up
//! to date before any repository is handed out.

use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;
use crate::seed::ensure_permission_catalog;

/// Where the CRM store lives and how to sign in to it.
#[derive(Clone)]
pub struct DbConfig {
    /// WebSocket endpoint, `host:port`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "crm".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Outcome of [`DbManager::prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prepared {
    pub seeded_permissions: u64,
}

/// A store client that has been, or is about to be, prepared for the
/// repositories.
#[derive(Clone)]
pub struct DbManager<C: Connection = Client> {
    db: Surreal<C>,
}

impl DbManager<Client> {
    /// Open a WebSocket session, sign in as root and select the configured
    /// namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to CRM store"
        );

        let db = Surreal::new::<Ws>(config.url.as_str()).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;

        Ok(Self { db })
    }
}

impl<C: Connection> DbManager<C> {
    /// Wrap a client whose namespace and database are already selected.
    pub fn from_client(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Apply pending migrations, then seed missing catalog permissions.
    /// Safe to run on every start.
    pub async fn prepare(&self) -> Result<Prepared, DbError> {
        run_migrations(&self.db).await?;
        let seeded_permissions = ensure_permission_catalog(&self.db).await?;

        info!(seeded_permissions, "CRM store ready");
        Ok(Prepared { seeded_permissions })
    }

    pub fn client(&self) -> &Surreal<C> {
        &self.db
    }
}
