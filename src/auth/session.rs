//! Session storage and management

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Persisted login session: bearer token plus the role claim it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub role: Option<String>,
    pub display_name: Option<String>,
    pub user_id: Option<String>,
    /// Token `exp` claim (unix seconds), informational only.
    pub expires_at: Option<u64>,
}

impl Session {
    #[cfg(test)]
    pub fn new(token: String, role: Option<String>) -> Self {
        Self {
            token,
            role,
            display_name: None,
            user_id: None,
            expires_at: None,
        }
    }

    /// Whether the role claim is one of `allowed` (case-insensitive).
    pub fn has_role(&self, allowed: &[&str]) -> bool {
        self.role
            .as_deref()
            .is_some_and(|role| allowed.iter().any(|a| a.eq_ignore_ascii_case(role)))
    }

    /// Seconds until the token's `exp`, or `None` if unknown or already past.
    pub fn remaining_secs(&self) -> Option<u64> {
        let exp = self.expires_at?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        exp.checked_sub(now).filter(|&left| left > 0)
    }
}

/// Single-writer session store.
///
/// Login replaces the session, logout and expiry invalidate it; everything
/// else only reads.
pub trait SessionStore {
    fn session(&self) -> Option<&Session>;
    fn replace(&mut self, session: Session);
    fn invalidate(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_role() {
        let session = Session::new("t".into(), Some("Admin".into()));
        assert!(session.has_role(&["admin"]));
        assert!(session.has_role(&["staff", "admin"]));
        assert!(!session.has_role(&["staff"]));

        let no_role = Session::new("t".into(), None);
        assert!(!no_role.has_role(&["admin"]));
    }

    #[test]
    fn test_remaining_secs() {
        let mut session = Session::new("t".into(), None);
        assert_eq!(session.remaining_secs(), None);

        session.expires_at = Some(1);
        assert_eq!(session.remaining_secs(), None);

        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        session.expires_at = Some(now + 3600);
        let left = session.remaining_secs().unwrap();
        assert!(left > 3500 && left <= 3600);
    }
}
