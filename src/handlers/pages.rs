use axum::{
    Json,
    extract::{Query, State},
    response::Html,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GateError;
use crate::html::escape;
use crate::middleware::auth::AuthedUser;
use crate::router::FiregateState;

#[derive(Debug, Deserialize)]
pub struct LandingQuery {
    pub redirect: Option<String>,
}

/// GET / -> public landing page; `?redirect=` is where sign-in should return to.
/// Only same-origin paths are offered as the return link.
pub async fn landing_page(Query(query): Query<LandingQuery>) -> Html<String> {
    let notice = match query.redirect.as_deref().filter(|t| is_local_path(t)) {
        Some(target) => format!(
            r#"<p class="text-gray-300">Sign in to continue to <a href="{0}">{0}</a>.</p>"#,
            escape(target)
        ),
        None => String::new(),
    };
    Html(format!(
        r#"<!doctype html><html><body><h1>Welcome</h1>{notice}</body></html>"#
    ))
}

/// An absolute path on this origin: `/...`, but not `//host` or `/\host`,
/// and no control characters (browsers strip tabs and newlines inside URLs).
fn is_local_path(target: &str) -> bool {
    let mut chars = target.chars();
    chars.next() == Some('/')
        && !matches!(chars.next(), Some('/' | '\\'))
        && !target.chars().any(|c| c.is_control())
}

/// GET /example -> the signed-in user's identity. Only reachable through the gate.
pub async fn example_page(AuthedUser(user): AuthedUser) -> Html<String> {
    let email = user.email.as_deref().map(escape);
    Html(format!(
        concat!(
            r#"<!doctype html><html><body>"#,
            r#"<h1>Protected Route Example</h1>"#,
            r#"<p>This route is protected by server-side Firebase authentication.</p>"#,
            r#"<h2>User Information</h2>"#,
            r#"<p><span>UID:</span> {uid}</p>"#,
            r#"<p><span>Email:</span> {email}</p>"#,
            r#"<p><span>Email Verified:</span> {verified}</p>"#,
            r#"</body></html>"#
        ),
        uid = escape(user.uid()),
        email = email.as_deref().unwrap_or("N/A"),
        verified = if user.email_verified { "Yes" } else { "No" },
    ))
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: &'static str,
}

/// GET /healthz
pub async fn health(State(state): State<FiregateState>) -> Result<Json<HealthReport>, GateError> {
    let database = match state.handles.database().await? {
        None => "unconfigured",
        Some(db) => match db.ping().await {
            Ok(()) => "ok",
            Err(e) => {
                warn!(error = %e, "database ping failed");
                "error"
            }
        },
    };
    Ok(Json(HealthReport {
        status: "ok",
        database,
    }))
}
