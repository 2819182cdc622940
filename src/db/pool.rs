use crate::error::GateError;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use tracing::info;

/// Query-capable handle to the application database.
#[derive(Clone, Debug)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Build a pool for `url` without opening a connection; the first query connects.
    pub fn connect(url: &str) -> Result<Self, GateError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(5).connect_lazy(url)?;
        info!(driver = %scheme(url), "database pool created");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Round-trip a trivial statement to prove the database is reachable.
    pub async fn ping(&self) -> Result<(), GateError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Never log the full URL: it carries credentials.
fn scheme(url: &str) -> &str {
    url.split_once(':').map(|(s, _)| s).unwrap_or("<unknown>")
}
