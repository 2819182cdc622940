use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// Default name of the cookie carrying the Firebase ID token.
pub const DEFAULT_TOKEN_COOKIE: &str = "firebase_token";

/// Issuer prefix for Firebase ID tokens; the project id is appended.
pub const SECURETOKEN_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// JWKS endpoint publishing the keys that sign Firebase ID tokens.
pub const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Environment keys this service reads. Everything else in the environment is ignored.
const ENV_KEYS: [&str; 7] = [
    "DATABASE_URL",
    "FIREBASE_PROJECT_ID",
    "FIREBASE_CLIENT_EMAIL",
    "FIREBASE_PRIVATE_KEY",
    "LOGLEVEL",
    "LISTEN_ADDR",
    "TOKEN_COOKIE",
];

/// Older name for `DATABASE_URL`; consulted only when `DATABASE_URL` is unset.
const DATABASE_URL_ALIAS: &str = "VITE_DATABASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connection string for the application database. `None` disables it.
    pub database_url: Option<String>,
    pub firebase_project_id: Option<String>,
    pub firebase_client_email: Option<String>,
    /// PEM private key; literal `\n` sequences are unescaped when the admin handle is built.
    pub firebase_private_key: Option<String>,
    pub loglevel: String,
    pub listen_addr: String,
    pub token_cookie: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            firebase_project_id: None,
            firebase_client_email: None,
            firebase_private_key: None,
            loglevel: "info".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            token_cookie: DEFAULT_TOKEN_COOKIE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, GateError> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(
                    Env::raw()
                        .only(&[DATABASE_URL_ALIAS])
                        .map(|_| "database_url".into()),
                )
                .merge(Env::raw().only(&ENV_KEYS)),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self, GateError> {
        let mut cfg: Config = figment.extract().map_err(Box::new)?;
        // Empty strings in `.env` files mean "unset".
        for field in [
            &mut cfg.database_url,
            &mut cfg.firebase_project_id,
            &mut cfg.firebase_client_email,
            &mut cfg.firebase_private_key,
        ] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_firebase_token_cookie() {
        let cfg = Config::from_figment(Figment::from(Serialized::defaults(Config::default())))
            .expect("defaults extract");
        assert_eq!(cfg.token_cookie, "firebase_token");
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn env_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FIREBASE_PROJECT_ID", "demo-project");
            jail.set_env("VITE_DATABASE_URL", "sqlite::memory:");
            jail.set_env("LOGLEVEL", "debug");
            let cfg = Config::from_env().expect("config from env");
            assert_eq!(cfg.firebase_project_id.as_deref(), Some("demo-project"));
            assert_eq!(cfg.database_url.as_deref(), Some("sqlite::memory:"));
            assert_eq!(cfg.loglevel, "debug");
            Ok(())
        });
    }

    #[test]
    fn database_url_beats_its_alias() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("VITE_DATABASE_URL", "sqlite::memory:");
            jail.set_env("DATABASE_URL", "postgres://db/app");
            let cfg = Config::from_env().expect("config from env");
            assert_eq!(cfg.database_url.as_deref(), Some("postgres://db/app"));
            Ok(())
        });
    }

    #[test]
    fn blank_values_are_unset() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "  ");
            let cfg = Config::from_env().expect("config from env");
            assert!(cfg.database_url.is_none());
            Ok(())
        });
    }
}
