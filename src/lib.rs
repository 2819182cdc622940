pub mod client_gate;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod handles;
pub mod html;
pub mod identity;
pub mod middleware;
pub mod router;

pub use error::{GateError, VerifyError};
pub use handles::Handles;
pub use identity::{DecodedIdToken, FirebaseAdmin, TokenVerifier};
