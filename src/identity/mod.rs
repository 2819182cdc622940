//! Firebase identity: admin handle, ID-token verification and signing keys.

pub mod admin;
pub mod claims;
pub mod keys;
pub mod verifier;

pub use admin::{FirebaseAdmin, FirebaseApp, ServiceAccount};
pub use claims::DecodedIdToken;
pub use keys::{GoogleKeySource, KeySource, StaticKeySource};
pub use verifier::{FirebaseAuth, TokenVerifier, VerifyOutcome, verify_auth_token};
