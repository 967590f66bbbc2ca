//! API client module for the bus-ticketing admin backend

mod buses;
pub mod client;
mod discounts;
mod error;
mod payments;
mod reports;
mod roles;
mod schedules;
mod tickets;
mod users;

pub use buses::{create_bus, delete_bus, list_buses};
pub use client::AdminClient;
pub use discounts::{create_discount, delete_discount, list_discounts};
pub use error::ApiError;
pub use payments::{download_receipt, list_payments};
pub use reports::revenue_report;
pub use roles::{
    create_role, delete_role, grant_permission, list_permissions, list_role_permissions,
    list_roles, revoke_permission,
};
pub use schedules::{change_status, generate_trips, list_trips, TripFilter};
pub use tickets::{list_tickets, show_ticket};
pub use users::{create_user, delete_user, list_users, set_user_role, show_user};

/// Build a `?a=b&c=d` suffix from the present pairs; empty when none are.
pub(crate) fn query_string(pairs: &[(&str, Option<String>)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in pairs {
        if let Some(v) = value {
            serializer.append_pair(key, v);
            any = true;
        }
    }
    if any {
        format!("?{}", serializer.finish())
    } else {
        String::new()
    }
}

/// Truncate for single-line table cells.
pub(crate) fn cell(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}
