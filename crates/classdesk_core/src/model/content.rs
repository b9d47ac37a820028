//! Posts and notifications, both owned by a single account.

use super::entity::{impl_entity, new_entity_id, now, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    /// -> Accounts.
    pub author_ref: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Post {
    pub fn new(
        author_ref: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let at = now();
        Self {
            id: new_entity_id(),
            author_ref: author_ref.into(),
            title: title.into(),
            body: body.into(),
            created_at: at,
            updated_at: at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    /// -> Accounts.
    pub recipient_ref: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Notification {
    pub fn new(
        recipient_ref: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let at = now();
        Self {
            id: new_entity_id(),
            recipient_ref: recipient_ref.into(),
            title: title.into(),
            message: message.into(),
            read: false,
            created_at: at,
            updated_at: at,
        }
    }
}

impl_entity!(Post, Posts, posts);
impl_entity!(Notification, Notifications, notifications);
