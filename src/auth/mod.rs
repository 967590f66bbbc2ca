//! Authentication and authorization for the admin backend
//!
//! Login exchanges credentials for a bearer token whose role claim drives
//! the route guard. The session lives in the config file between runs.

pub mod claims;
pub mod guard;
pub mod login;
pub mod session;

pub use login::{login, logout, profile, status};
pub use session::{Session, SessionStore};
