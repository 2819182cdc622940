//! Client-side gate: choose what to show from an externally maintained sign-in state.
//!
//! The state is produced by whatever session SDK runs alongside (it is fed into
//! a `watch` channel); this module performs no verification of its own.

use tokio::sync::watch;

use crate::html::escape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignInState {
    /// The session SDK has not reported yet.
    #[default]
    Loading,
    SignedOut,
    SignedIn,
}

/// How the sign-in widget tracks its own steps in the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetRouting {
    /// Steps live in the fragment; works on any route without server support.
    #[default]
    Hash,
    /// Steps are real paths under the current route.
    Path,
}

impl WidgetRouting {
    fn as_str(self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Path => "path",
        }
    }
}

/// Configuration handed to the sign-in widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInWidget {
    pub routing: WidgetRouting,
    pub force_redirect_url: String,
    pub sign_up_force_redirect_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientView {
    Loading,
    SignIn(SignInWidget),
    Protected,
}

/// Pick the single view for `state`. Both redirect URLs point back at
/// `current_url`, or `/` when the location is unknown.
pub fn select_view(
    state: SignInState,
    current_url: Option<&str>,
    routing: WidgetRouting,
) -> ClientView {
    match state {
        SignInState::Loading => ClientView::Loading,
        SignInState::SignedOut => {
            let back = current_url.unwrap_or("/").to_string();
            ClientView::SignIn(SignInWidget {
                routing,
                force_redirect_url: back.clone(),
                sign_up_force_redirect_url: back,
            })
        }
        SignInState::SignedIn => ClientView::Protected,
    }
}

impl ClientView {
    /// Render to markup. `children` is only invoked for `Protected`.
    pub fn render(&self, children: impl FnOnce() -> String) -> String {
        match self {
            Self::Loading => concat!(
                r#"<div class="flex items-center justify-center min-h-screen">"#,
                r#"<div class="text-lg">Loading...</div></div>"#
            )
            .to_string(),
            Self::SignIn(widget) => format!(
                concat!(
                    r#"<div class="flex items-center justify-center min-h-screen p-4">"#,
                    r#"<div id="sign-in" data-routing="{}" data-force-redirect-url="{}" "#,
                    r#"data-sign-up-force-redirect-url="{}"></div></div>"#
                ),
                widget.routing.as_str(),
                escape(&widget.force_redirect_url),
                escape(&widget.sign_up_force_redirect_url),
            ),
            Self::Protected => children(),
        }
    }
}

/// Gate bound to a live sign-in state source.
#[derive(Debug, Clone)]
pub struct ClientGate {
    state: watch::Receiver<SignInState>,
    routing: WidgetRouting,
}

impl ClientGate {
    pub fn new(state: watch::Receiver<SignInState>) -> Self {
        Self {
            state,
            routing: WidgetRouting::default(),
        }
    }

    pub fn with_routing(mut self, routing: WidgetRouting) -> Self {
        self.routing = routing;
        self
    }

    pub fn state(&self) -> SignInState {
        *self.state.borrow()
    }

    pub fn view(&self, current_url: Option<&str>) -> ClientView {
        select_view(self.state(), current_url, self.routing)
    }

    /// Wait for the next state change. `None` once the source is gone.
    pub async fn changed(&mut self) -> Option<SignInState> {
        self.state.changed().await.ok()?;
        Some(*self.state.borrow_and_update())
    }
}
