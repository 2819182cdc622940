use axum::{Router, middleware::from_fn_with_state, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::GateError;
use crate::handlers::pages::{example_page, health, landing_page};
use crate::handles::Handles;
use crate::middleware::auth::{ServerGate, require_auth};

#[derive(Clone)]
pub struct FiregateState {
    pub handles: Arc<Handles>,
    pub gate: ServerGate,
}

impl FiregateState {
    /// Gate tokens with the Firebase admin handle. Fails if it cannot be built.
    pub async fn new(handles: Arc<Handles>) -> Result<Self, GateError> {
        let auth = handles.admin().await?.auth().clone();
        let gate = ServerGate::new(Arc::new(auth), handles.config().token_cookie.as_str());
        Ok(Self::with_gate(handles, gate))
    }

    pub fn with_gate(handles: Arc<Handles>, gate: ServerGate) -> Self {
        Self { handles, gate }
    }
}

pub fn firegate_router(state: FiregateState) -> Router {
    // Everything merged here sits behind the server-side gate.
    let authed = Router::new()
        .route("/example", get(example_page))
        .route_layer(from_fn_with_state(state.gate.clone(), require_auth));

    Router::new()
        .route("/", get(landing_page))
        .route("/healthz", get(health))
        .merge(authed)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
