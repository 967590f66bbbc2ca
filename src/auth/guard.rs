//! Route guard: decides whether a protected view may be shown.
//!
//! Two gates compose. The authentication gate sends anyone without a stored
//! token (or without a role claim) to the login view. The authorization gate
//! sends a role outside the view's allow-list to the forbidden view. The
//! guard never touches the network.

use super::session::{Session, SessionStore};
use crate::api::ApiError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";

/// Roles allowed to open a view.
pub type AccessPolicy = &'static [&'static str];

const ADMIN_ONLY: AccessPolicy = &[ROLE_ADMIN];
const BACK_OFFICE: AccessPolicy = &[ROLE_ADMIN, ROLE_STAFF];

/// Views reachable from the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Forbidden,
    Profile,
    Users,
    Roles,
    Discounts,
    Buses,
    Schedules,
    Tickets,
    Payments,
    Reports,
    Chat,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Forbidden => "/403",
            Route::Profile => "/profile",
            Route::Users => "/admin/users",
            Route::Roles => "/admin/roles",
            Route::Discounts => "/admin/discounts",
            Route::Buses => "/admin/buses",
            Route::Schedules => "/admin/bus-schedules",
            Route::Tickets => "/admin/tickets",
            Route::Payments => "/admin/payments",
            Route::Reports => "/admin/reports",
            Route::Chat => "/admin/chat",
        }
    }

    /// Roles allowed to open the view; `None` for public views.
    pub fn allowed_roles(self) -> Option<AccessPolicy> {
        match self {
            Route::Login | Route::Forbidden => None,
            Route::Users | Route::Roles | Route::Reports => Some(ADMIN_ONLY),
            Route::Profile
            | Route::Discounts
            | Route::Buses
            | Route::Schedules
            | Route::Tickets
            | Route::Payments
            | Route::Chat => Some(BACK_OFFICE),
        }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render,
    Redirect(Route),
}

/// Check a session against an explicit allow-list.
pub fn check(session: Option<&Session>, allowed: &[&str]) -> Navigation {
    let session = match session {
        Some(s) if !s.token.is_empty() => s,
        _ => return Navigation::Redirect(Route::Login),
    };
    if session.role.as_deref().map_or(true, str::is_empty) {
        return Navigation::Redirect(Route::Login);
    }
    if session.has_role(allowed) {
        Navigation::Render
    } else {
        Navigation::Redirect(Route::Forbidden)
    }
}

/// Check a session against a route's own allow-list.
pub fn guard(session: Option<&Session>, route: Route) -> Navigation {
    match route.allowed_roles() {
        None => Navigation::Render,
        Some(allowed) => check(session, allowed),
    }
}

/// React to a failed guarded call.
///
/// An expired or rejected session is invalidated through the store and the
/// caller is sent to the forbidden view. Any other failure is left to the
/// caller to report; it returns `None`.
pub fn on_failure<S: SessionStore>(err: &anyhow::Error, store: &mut S) -> Option<Navigation> {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::SessionExpired { .. }) => {
            tracing::warn!("Session expired, clearing stored credentials");
            store.invalidate();
            Some(Navigation::Redirect(Route::Forbidden))
        }
        _ => None,
    }
}
