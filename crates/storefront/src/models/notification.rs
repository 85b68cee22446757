use chrono::{DateTime, Utc};

use bearing_shop_core::{NotificationId, UserId};

/// A message shown in the customer's notification inbox.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub link_url: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
