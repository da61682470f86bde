use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn new(email: String, username: String, first_name: String, last_name: String) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            username,
            first_name,
            last_name,
            is_admin: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Authors may mutate their own recipes; admins may mutate any.
    pub fn can_modify(&self, author_id: &str) -> bool {
        self.is_admin || self.id == author_id
    }
}

/// Public representation of a user, relative to whoever is looking.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub email: String,
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn new(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}
