use axum::extract::{FromRequestParts, OriginalUri, Request, State};
use axum::http::{HeaderMap, Uri, request::Parts};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use std::sync::Arc;
use tracing::debug;

use crate::identity::{DecodedIdToken, TokenVerifier, VerifyOutcome, verify_auth_token};
use crate::middleware::token::extract_token;

/// Where the visitor was going, as path plus query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    href: String,
}

impl Location {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    pub fn from_uri(uri: &Uri) -> Self {
        let href = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        Self::new(href)
    }

    /// Prefer the URI before any `Router::nest` prefix stripping.
    fn of_request(extensions: &axum::http::Extensions, uri: &Uri) -> Self {
        match extensions.get::<OriginalUri>() {
            Some(OriginalUri(original)) => Self::from_uri(original),
            None => Self::from_uri(uri),
        }
    }

    pub fn href(&self) -> &str {
        &self.href
    }
}

/// Identity attached to a request that passed the gate.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: DecodedIdToken,
}

/// Send the visitor to `/` with `?redirect=<href>` so sign-in can return them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandingRedirect {
    return_to: String,
}

impl LandingRedirect {
    pub fn to(location: &Location) -> Self {
        Self {
            return_to: location.href().to_string(),
        }
    }

    pub fn return_to(&self) -> &str {
        &self.return_to
    }

    pub fn target(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("redirect", &self.return_to)
            .finish();
        format!("/?{query}")
    }
}

impl IntoResponse for LandingRedirect {
    fn into_response(self) -> Response {
        Redirect::temporary(&self.target()).into_response()
    }
}

/// Outcome of the gate: exactly one of these per navigation.
#[derive(Debug)]
pub enum GateDecision {
    Proceed(AuthContext),
    Redirect(LandingRedirect),
}

/// Server-side gate in front of the protected route subtree.
#[derive(Clone)]
pub struct ServerGate {
    verifier: Arc<dyn TokenVerifier>,
    cookie_name: Arc<str>,
}

impl ServerGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>, cookie_name: impl Into<Arc<str>>) -> Self {
        Self {
            verifier,
            cookie_name: cookie_name.into(),
        }
    }

    /// Decide whether the navigation to `location` may proceed.
    ///
    /// `request` is `None` when there is no inbound request to inspect; that
    /// fails closed like a missing or rejected token.
    pub async fn evaluate(&self, request: Option<&HeaderMap>, location: &Location) -> GateDecision {
        let href = location.href();
        let Some(headers) = request else {
            debug!(href, "no request context; redirecting to landing");
            return GateDecision::Redirect(LandingRedirect::to(location));
        };
        let Some(token) = extract_token(headers, &self.cookie_name) else {
            debug!(href, "no ID token presented; redirecting to landing");
            return GateDecision::Redirect(LandingRedirect::to(location));
        };

        debug!(href, "verifying ID token");
        match verify_auth_token(self.verifier.as_ref(), &token).await {
            VerifyOutcome::Verified(user) => {
                debug!(href, uid = %user.sub, "authenticated");
                GateDecision::Proceed(AuthContext { user })
            }
            VerifyOutcome::Rejected(_) => GateDecision::Redirect(LandingRedirect::to(location)),
        }
    }
}

/// Axum middleware: run the gate and attach `AuthContext` for downstream handlers.
pub async fn require_auth(State(gate): State<ServerGate>, mut req: Request, next: Next) -> Response {
    let location = Location::of_request(req.extensions(), req.uri());
    let decision = gate.evaluate(Some(req.headers()), &location).await;
    match decision {
        GateDecision::Proceed(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        GateDecision::Redirect(redirect) => redirect.into_response(),
    }
}

/// The verified user of a request that went through `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthedUser(pub DecodedIdToken);

impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthContext>() {
            Some(ctx) => Ok(Self(ctx.user.clone())),
            // Route is not behind the gate: fail closed the same way.
            None => {
                let location = Location::of_request(&parts.extensions, &parts.uri);
                Err(LandingRedirect::to(&location).into_response())
            }
        }
    }
}
