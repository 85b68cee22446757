//! Notification inbox and live unread-count feed.

use std::convert::Infallible;
use std::future::Future;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{
        AppendHeaders, IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::instrument;

use bearing_shop_core::{NotificationId, UserId};

use crate::db::{NotificationRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Notification;
use crate::services::feed::{Subscription, wait_closed};
use crate::routes::layout::Layout;
use crate::state::AppState;

/// Notifications shown in the inbox.
const INBOX_LIMIT: i64 = 50;

/// Notification display data for templates.
#[derive(Clone)]
pub struct NotificationView {
    pub id: i32,
    pub title: String,
    pub message: String,
    pub link_url: Option<String>,
    pub read: bool,
    pub created: String,
}

impl From<&Notification> for NotificationView {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.as_i32(),
            title: n.title.clone(),
            message: n.message.clone(),
            link_url: n.link_url.clone(),
            read: n.read,
            created: n.created_at.format("%d %b %Y %H:%M").to_string(),
        }
    }
}

/// Inbox page template.
#[derive(Template, WebTemplate)]
#[template(path = "notifications/index.html")]
pub struct NotificationsTemplate {
    pub layout: Layout,
    pub notifications: Vec<NotificationView>,
    pub unread: i64,
}

/// Inbox list fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/notification_list.html")]
pub struct NotificationListTemplate {
    pub notifications: Vec<NotificationView>,
    pub unread: i64,
}

/// Unread badge fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/notification_count.html")]
pub struct NotificationCountTemplate {
    pub count: i64,
}

async fn inbox(state: &AppState, user_id: UserId) -> Result<(Vec<NotificationView>, i64)> {
    let repo = NotificationRepository::new(state.pool());
    let notifications = repo.list(user_id, INBOX_LIMIT).await?;
    let unread = repo.unread_count(user_id).await?;
    Ok((
        notifications.iter().map(NotificationView::from).collect(),
        unread,
    ))
}

/// HTMX callers get the refreshed list; form posts go back to the inbox.
async fn after_change(state: &AppState, headers: &HeaderMap, user_id: UserId) -> Result<Response> {
    if !headers.contains_key("hx-request") {
        return Ok(Redirect::to("/notifications").into_response());
    }
    let (notifications, unread) = inbox(state, user_id).await?;
    Ok((
        AppendHeaders([("HX-Trigger", "notifications-updated")]),
        NotificationListTemplate {
            notifications,
            unread,
        },
    )
        .into_response())
}

/// Display the inbox.
#[instrument(skip(state, user, layout), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let (notifications, unread) = inbox(&state, user.id).await?;
    Ok(NotificationsTemplate {
        layout,
        notifications,
        unread,
    })
}

/// Mark one notification read.
#[instrument(skip(state, user, headers), fields(user_id = %user.id))]
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Response> {
    match NotificationRepository::new(state.pool())
        .mark_read(NotificationId::new(id), user.id)
        .await
    {
        Ok(()) => {}
        Err(RepositoryError::NotFound) => {
            return Err(AppError::NotFound(format!("notification {id}")));
        }
        Err(e) => return Err(e.into()),
    }
    after_change(&state, &headers, user.id).await
}

/// Mark all of the customer's notifications read.
#[instrument(skip(state, user, headers), fields(user_id = %user.id))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
) -> Result<Response> {
    let updated = NotificationRepository::new(state.pool())
        .mark_all_read(user.id)
        .await?;
    tracing::debug!(updated, "Marked notifications read");
    after_change(&state, &headers, user.id).await
}

/// Unread badge.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let count = NotificationRepository::new(state.pool())
        .unread_count(user.id)
        .await?;
    Ok(NotificationCountTemplate { count })
}

/// Server-sent events carrying the unread count.
///
/// Streams share the process-wide
/// [`NotificationFeed`](crate::services::NotificationFeed) and hold no
/// database connection between events.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn stream(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let pool = state.pool().clone();
    let user_id = user.id;
    let counts = unread_counts(state.notifications().subscribe(), user_id, move || {
        let pool = pool.clone();
        async move { NotificationRepository::new(&pool).unread_count(user_id).await }
    });
    Sse::new(counts.map(|count| Ok::<_, Infallible>(unread_event(count))))
        .keep_alive(KeepAlive::default())
}

/// Unread counts for one customer: one on connect, then one per feed
/// payload naming them. Ends when the feed closes.
fn unread_counts<F, Fut>(
    subscription: Subscription,
    user_id: UserId,
    load: F,
) -> impl Stream<Item = i64> + Send
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = std::result::Result<i64, RepositoryError>> + Send,
{
    let Subscription {
        mut payloads,
        mut closed,
    } = subscription;
    let own_payload = user_id.to_string();

    async_stream::stream! {
        let mut refresh = true;
        loop {
            if refresh {
                match load().await {
                    Ok(count) => yield count,
                    Err(e) => tracing::warn!(error = %e, "Failed to load unread count"),
                }
            }
            refresh = tokio::select! {
                received = payloads.recv() => match received {
                    Ok(payload) => payload == own_payload,
                    // Missed payloads may have been ours
                    Err(RecvError::Lagged(_)) => true,
                    Err(RecvError::Closed) => break,
                },
                () = wait_closed(&mut closed) => break,
            };
        }
    }
}

fn unread_event(count: i64) -> Event {
    Event::default().event("unread").data(count.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::NotificationFeed;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn customer() -> UserId {
        UserId::new(uuid::Uuid::from_u128(0x5eed))
    }

    #[tokio::test]
    async fn test_unread_counts_follow_own_payloads_until_close() {
        let feed = NotificationFeed::new();
        let unread = Arc::new(AtomicI64::new(2));
        let loader = Arc::clone(&unread);
        let counts = unread_counts(feed.subscribe(), customer(), move || {
            let loader = Arc::clone(&loader);
            async move { Ok(loader.load(Ordering::SeqCst)) }
        });
        futures::pin_mut!(counts);

        assert_eq!(counts.next().await, Some(2));

        unread.store(3, Ordering::SeqCst);
        feed.publish(&UserId::new(uuid::Uuid::from_u128(0xbeef)).to_string());
        feed.publish(&customer().to_string());
        assert_eq!(counts.next().await, Some(3));

        feed.close();
        assert_eq!(counts.next().await, None);
    }

    #[test]
    fn test_notification_view_formats_date() {
        let n = Notification {
            id: NotificationId::new(3),
            user_id: UserId::new(uuid::Uuid::nil()),
            title: "Order shipped".to_owned(),
            message: "Order BS-000042 is on its way.".to_owned(),
            link_url: Some("/account/orders/42".to_owned()),
            read: false,
            created_at: Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 0).unwrap(),
        };
        let view = NotificationView::from(&n);
        assert_eq!(view.id, 3);
        assert_eq!(view.created, "05 Mar 2026 14:30");
        assert!(!view.read);
    }
}
