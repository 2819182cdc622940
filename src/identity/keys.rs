use crate::config::SECURETOKEN_JWKS_URL;
use crate::error::VerifyError;
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey};
use reqwest::header::{CACHE_CONTROL, HeaderMap};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Used when the key endpoint does not send `Cache-Control: max-age`.
const FALLBACK_KEY_TTL: Duration = Duration::from_secs(300);

/// Resolves the public key that signed a token, by the token's `kid`.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Algorithm every token signed by this source must declare.
    fn algorithm(&self) -> Algorithm {
        Algorithm::RS256
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, VerifyError>;
}

/// Google's published securetoken keys.
///
/// Google rotates these keys and announces the lifetime of each set through
/// `Cache-Control: max-age`. A set is reused until that lifetime runs out; a
/// `kid` missing from a live set is rejected without contacting Google.
/// Refetches are single-flight.
pub struct GoogleKeySource {
    client: reqwest::Client,
    url: String,
    current: RwLock<Option<PublishedKeys>>,
    refresh: Mutex<()>,
}

struct PublishedKeys {
    keys: JwkSet,
    expires_at: Instant,
}

impl PublishedKeys {
    fn is_live(&self) -> bool {
        self.expires_at > Instant::now()
    }

    fn key_for(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        match self.keys.find(kid) {
            Some(jwk) => Ok(DecodingKey::from_jwk(jwk)?),
            None => Err(VerifyError::UnknownKeyId(kid.to_string())),
        }
    }
}

impl GoogleKeySource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_url(client, SECURETOKEN_JWKS_URL)
    }

    pub fn with_url(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            current: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Answer from the live set, if there is one.
    async fn from_live_set(&self, kid: &str) -> Option<Result<DecodingKey, VerifyError>> {
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|set| set.is_live())
            .map(|set| set.key_for(kid))
    }

    async fn fetch(&self) -> Result<PublishedKeys, VerifyError> {
        let resp = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?;
        let ttl = max_age(resp.headers()).unwrap_or(FALLBACK_KEY_TTL);
        let keys: JwkSet = resp.json().await?;
        info!(
            count = keys.keys.len(),
            ttl_secs = ttl.as_secs(),
            "fetched securetoken signing keys"
        );
        Ok(PublishedKeys {
            keys,
            expires_at: Instant::now() + ttl,
        })
    }
}

#[async_trait]
impl KeySource for GoogleKeySource {
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        if let Some(found) = self.from_live_set(kid).await {
            return found;
        }

        let _refreshing = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(found) = self.from_live_set(kid).await {
            return found;
        }

        debug!(kid, "signing key set missing or expired; fetching");
        let fresh = self.fetch().await?;
        let key = fresh.key_for(kid);
        *self.current.write().await = Some(fresh);
        key
    }
}

/// A single fixed key, for emulators, offline setups and tests.
#[derive(Clone)]
pub struct StaticKeySource {
    kid: String,
    algorithm: Algorithm,
    key: DecodingKey,
}

impl StaticKeySource {
    pub fn new(kid: impl Into<String>, algorithm: Algorithm, key: DecodingKey) -> Self {
        Self {
            kid: kid.into(),
            algorithm,
            key,
        }
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        if kid == self.kid {
            Ok(self.key.clone())
        } else {
            Err(VerifyError::UnknownKeyId(kid.to_string()))
        }
    }
}

fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|directive| directive.trim().strip_prefix("max-age="))
        .and_then(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
