//! User projection.
//!
//! Users are owned by the external identity service; this backend keeps the profile carried by
//! the access token and the list of purchased courses.

use serde::{Deserialize, Serialize};

use super::AuthorRef;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Ids of purchased courses, oldest purchase first
    #[serde(default)]
    pub courses: Vec<String>,
    pub created_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn author(&self) -> AuthorRef {
        AuthorRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}
