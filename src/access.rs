//! Page-access gate: which views need a signed-in user and where each
//! request lands.

use serde::Serialize;

use crate::error::FarmacoError;
use crate::sources::supabase::ACCESS_TOKEN_ENV;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Public entry view.
    Welcome,
    /// Login guidance.
    Login,
    /// Disease list, wizard, plan and export.
    Protected,
}

impl View {
    pub fn is_protected(self) -> bool {
        matches!(self, Self::Protected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "route", content = "view", rename_all = "snake_case")]
pub enum Route {
    Render(View),
    Redirect(View),
}

pub fn route(view: View, authenticated: bool) -> Route {
    match (view, authenticated) {
        (View::Protected, false) => Route::Redirect(View::Login),
        (View::Welcome, true) => Route::Redirect(View::Protected),
        (view, _) => Route::Render(view),
    }
}

pub fn login_hint() -> String {
    format!(
        "Sign in through the web app, then export the session token:\n  export {ACCESS_TOKEN_ENV}=<access token>\n\nOr work offline with: farmacohub --fixtures <catalog.json> <command>"
    )
}

/// Errors unless the protected area may be rendered.
pub fn require_protected(authenticated: bool) -> Result<(), FarmacoError> {
    match route(View::Protected, authenticated) {
        Route::Render(_) => Ok(()),
        Route::Redirect(_) => Err(FarmacoError::AuthenticationRequired {
            login_hint: login_hint(),
        }),
    }
}
