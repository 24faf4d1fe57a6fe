//! User account aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AuthError, AuthenticatedUser, Timestamp, UserId, UserRole, ValidationError,
};

const MAX_DISPLAY_NAME: usize = 100;

/// A registered account.
///
/// Credentials live with the identity service; this record only carries
/// what the chat service needs to authorize requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Creates a new active account after normalizing the email.
    pub fn new(
        email: &str,
        display_name: Option<String>,
        role: UserRole,
    ) -> Result<Self, ValidationError> {
        let email = normalize_email(email)?;
        let display_name = normalize_display_name(display_name)?;
        let now = Timestamp::now();
        Ok(Self {
            id: UserId::new(),
            email,
            display_name,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Request identity for this account, refusing disabled accounts.
    pub fn to_authenticated(&self) -> Result<AuthenticatedUser, AuthError> {
        if !self.is_active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(AuthenticatedUser::new(
            self.id,
            self.email.clone(),
            self.display_name.clone(),
            self.role,
        ))
    }

    /// Applies an admin edit. Fields left as `None` are unchanged.
    pub fn apply(&mut self, update: UserUpdate) -> Result<(), ValidationError> {
        if let Some(display_name) = update.display_name {
            self.display_name = normalize_display_name(display_name)?;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

/// Partial update of a user record.
///
/// `display_name: Some(None)` clears the name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub display_name: Option<Option<String>>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    /// True when applying this update to one's own account would lock the
    /// actor out of administration.
    pub fn locks_out_self(&self) -> bool {
        self.role == Some(UserRole::User) || self.is_active == Some(false)
    }
}

pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::empty_field("email"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ValidationError::invalid_format("email", "expected name@domain")),
    }
}

fn normalize_display_name(name: Option<String>) -> Result<Option<String>, ValidationError> {
    match name.map(|n| n.trim().to_string()) {
        Some(n) if n.is_empty() => Ok(None),
        Some(n) if n.chars().count() > MAX_DISPLAY_NAME => Err(ValidationError::too_long(
            "display_name",
            MAX_DISPLAY_NAME,
            n.chars().count(),
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_normalizes_email() {
        let user = User::new("  Alice@Example.COM ", None, UserRole::User).unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(user.is_active);
        assert!(!user.is_admin());
    }

    #[test]
    fn invalid_emails_rejected() {
        assert!(User::new("", None, UserRole::User).is_err());
        assert!(User::new("no-at-sign", None, UserRole::User).is_err());
        assert!(User::new("@example.com", None, UserRole::User).is_err());
        assert!(User::new("a@localhost", None, UserRole::User).is_err());
    }

    #[test]
    fn blank_display_name_becomes_none() {
        let user = User::new("a@example.com", Some("   ".to_string()), UserRole::User).unwrap();
        assert_eq!(user.display_name, None);
    }

    #[test]
    fn disabled_user_cannot_authenticate() {
        let mut user = User::new("a@example.com", None, UserRole::Admin).unwrap();
        assert!(user.to_authenticated().unwrap().is_admin());

        user.is_active = false;
        assert_eq!(user.to_authenticated(), Err(AuthError::AccountDisabled));
    }

    #[test]
    fn apply_updates_only_given_fields() {
        let mut user = User::new("a@example.com", Some("Al".to_string()), UserRole::User).unwrap();
        user.apply(UserUpdate {
            role: Some(UserRole::Admin),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.display_name.as_deref(), Some("Al"));

        user.apply(UserUpdate {
            display_name: Some(None),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(user.display_name, None);
    }

    #[test]
    fn lockout_detection() {
        assert!(UserUpdate {
            is_active: Some(false),
            ..Default::default()
        }
        .locks_out_self());
        assert!(UserUpdate {
            role: Some(UserRole::User),
            ..Default::default()
        }
        .locks_out_self());
        assert!(!UserUpdate {
            display_name: Some(Some("New".to_string())),
            ..Default::default()
        }
        .locks_out_self());
    }
}
