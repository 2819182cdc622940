use crate::config::Config;
use crate::db::Database;
use crate::error::GateError;
use crate::identity::{FirebaseAdmin, GoogleKeySource, KeySource, ServiceAccount};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// Long-lived external handles, each built on first use and then reused.
///
/// Owned by the startup routine and shared by reference; nothing here is global.
pub struct Handles {
    config: Config,
    keys: Arc<dyn KeySource>,
    database: OnceCell<Option<Database>>,
    admin: OnceCell<FirebaseAdmin>,
}

impl Handles {
    /// Handles that verify tokens against Google's published securetoken keys.
    pub fn new(config: Config) -> Result<Self, GateError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("firegate/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self::with_key_source(
            config,
            Arc::new(GoogleKeySource::new(client)),
        ))
    }

    pub fn with_key_source(config: Config, keys: Arc<dyn KeySource>) -> Self {
        Self {
            config,
            keys,
            database: OnceCell::new(),
            admin: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The application database, or `None` when no connection string is configured.
    pub async fn database(&self) -> Result<Option<&Database>, GateError> {
        let db = self
            .database
            .get_or_try_init(|| async {
                match self.config.database_url.as_deref() {
                    Some(url) => Database::connect(url).map(Some),
                    None => {
                        debug!("DATABASE_URL not set; database handle unavailable");
                        Ok(None)
                    }
                }
            })
            .await?;
        Ok(db.as_ref())
    }

    /// The Firebase admin handle. Errors if the service account is not configured.
    pub async fn admin(&self) -> Result<&FirebaseAdmin, GateError> {
        self.admin
            .get_or_try_init(|| async {
                let credential = ServiceAccount::from_config(&self.config)?;
                FirebaseAdmin::initialize(credential, self.keys.clone())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticKeySource;
    use jsonwebtoken::{Algorithm, DecodingKey};

    fn handles(config: Config) -> Handles {
        let keys = StaticKeySource::new("k1", Algorithm::HS256, DecodingKey::from_secret(b"s"));
        Handles::with_key_source(config, Arc::new(keys))
    }

    #[tokio::test]
    async fn database_is_built_once() {
        let h = handles(Config {
            database_url: Some("sqlite::memory:".into()),
            ..Config::default()
        });
        let first = h.database().await.expect("db").expect("configured");
        let second = h.database().await.expect("db").expect("configured");
        assert!(std::ptr::eq(first, second));
    }

    #[tokio::test]
    async fn database_absent_without_url() {
        let h = handles(Config::default());
        assert!(h.database().await.expect("db").is_none());
        assert!(h.database().await.expect("db").is_none());
    }

    #[tokio::test]
    async fn admin_requires_service_account() {
        let h = handles(Config::default());
        assert!(matches!(
            h.admin().await,
            Err(GateError::MissingConfig("FIREBASE_PROJECT_ID"))
        ));
    }

    #[tokio::test]
    async fn admin_is_built_once() {
        let h = handles(Config {
            firebase_project_id: Some("demo".into()),
            firebase_client_email: Some("svc@demo.iam.gserviceaccount.com".into()),
            firebase_private_key: Some(
                include_str!("../tests/fixtures/service_account_key.pem").replace('\n', "\\n"),
            ),
            ..Config::default()
        });
        let first = h.admin().await.expect("admin");
        let second = h.admin().await.expect("admin");
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.app().client_email(), "svc@demo.iam.gserviceaccount.com");
    }
}
