use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Claims of a verified Firebase ID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedIdToken {
    /// Firebase uid.
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub auth_time: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub firebase: Option<FirebaseClaims>,
    /// Custom claims set through the admin SDK.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirebaseClaims {
    #[serde(default)]
    pub sign_in_provider: Option<String>,
    #[serde(default)]
    pub identities: HashMap<String, Value>,
    #[serde(default)]
    pub tenant: Option<String>,
}

impl DecodedIdToken {
    pub fn uid(&self) -> &str {
        &self.sub
    }
}
