//! User records referenced by notes.
//!
//! Users are read-only here. Profile fields are passed through untouched.

use crate::pb;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Unset,
    User,
    Admin,
}

impl From<pb::UserRole> for UserRole {
    fn from(value: pb::UserRole) -> Self {
        match value {
            pb::UserRole::RoleUnset => Self::Unset,
            pb::UserRole::RoleUser => Self::User,
            pb::UserRole::RoleAdmin => Self::Admin,
        }
    }
}

/// User profile as streamed by a users backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub created: String,
    pub updated: String,
    /// Non-empty when the account is tombstoned.
    pub deleted: String,
    pub email: String,
    pub role: UserRole,
    pub sub: String,
    pub name: String,
    pub avatar_id: String,
}

impl From<pb::User> for User {
    fn from(value: pb::User) -> Self {
        let role = UserRole::from(value.role());
        Self {
            id: value.id,
            created: value.created,
            updated: value.updated,
            deleted: value.deleted,
            email: value.email,
            role,
            sub: value.sub,
            name: value.name,
            avatar_id: value.avatar_id,
        }
    }
}
