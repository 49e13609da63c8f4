//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Boss,
    Employe,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Boss => "boss",
            Role::Employe => "employe",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "client" => Some(Role::Client),
            "boss" => Some(Role::Boss),
            "employe" => Some(Role::Employe),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which accounts a listing may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserScope {
    All,
    Role(Role),
    /// Accounts with the role, plus the account with this id
    RoleOrSelf(Role, i64),
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub is_staff: bool,
    pub role: String,
    pub address: Option<String>,
    pub location: Option<String>,
    pub province: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Unknown stored roles are treated as clients
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::Client)
    }
}

/// Public view of an account, as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub image: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub province: Option<String>,
    pub phone: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role(),
            image: user.image.clone(),
            address: user.address.clone(),
            location: user.location.clone(),
            province: user.province.clone(),
            phone: user.phone.clone(),
        }
    }
}

/// Account fields accepted on registration and account updates
///
/// Role and staff flag are never taken from input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountInput {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub province: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_staff: bool,
    pub image: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub province: Option<String>,
    pub phone: Option<String>,
}

/// Profile changes; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub province: Option<String>,
    pub phone: Option<String>,
}

/// Password change body for `/change-password/`
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_names() {
        for role in [Role::Client, Role::Boss, Role::Employe] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let now = Utc::now();
        let user = User {
            id: 1,
            username: "ana".into(),
            name: "Ana".into(),
            email: "ana@menu.es".into(),
            image: None,
            is_staff: false,
            role: "client".into(),
            address: None,
            location: None,
            province: None,
            phone: None,
            password_hash: "sha256$salt$digest".into(),
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(user.role(), Role::Client);

        let profile = serde_json::to_value(UserProfile::from(&user)).unwrap();
        assert_eq!(profile["role"], "client");
        assert!(profile.get("is_staff").is_none());
    }
}
