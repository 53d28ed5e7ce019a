//! Database handle.
//!
//! SeaORM over SQLite, MySQL/MariaDB or PostgreSQL; the backend is inferred
//! from the connection URL and migrations run on connect.

mod connection;

use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{KurzError, Result};

pub use connection::{connect_generic, connect_sqlite, run_migrations};

/// Infer the database backend from a connection URL.
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(KurzError::database_config(format!(
            "Cannot infer database backend from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// An established connection, shared by both stores.
#[derive(Clone)]
pub struct LinkDatabase {
    conn: DatabaseConnection,
    backend_name: String,
}

impl LinkDatabase {
    /// Connect and migrate.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(KurzError::database_config("Database URL is not set"));
        }

        let backend_name = infer_backend_from_url(&config.url)?;

        let conn = if backend_name == "sqlite" {
            connect_sqlite(&config.url).await?
        } else {
            connect_generic(&config.url, &backend_name, config.pool_size).await?
        };

        run_migrations(&conn).await?;

        info!("{} storage initialized", backend_name.to_uppercase());
        Ok(Self { conn, backend_name })
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }
}
