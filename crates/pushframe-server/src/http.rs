//! The HTTP submission API.
//!
//! Two endpoints, both thin validators over the core:
//!
//! - `GET /auth?server_key=...` exchanges a producer's server key for a
//!   bearer access token.
//! - `POST /sendmessage` checks the bearer token, validates the request
//!   body, and hands the message to the relay. The response says only
//!   whether the request was accepted; delivery is fire-and-forget and
//!   has no outcome to report.
//!
//! The application id is always taken from the authenticated token,
//! never from the request body.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pushframe_core::{Audience, Message, MessageSender, Notification};
use pushframe_directory::{SharedDirectory, TokenStatus};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Shared state of the HTTP layer.
pub struct ApiState {
    /// Application registry, for credential checks and token issue.
    pub directory: SharedDirectory,
    /// The core submission API.
    pub sender: Arc<dyn MessageSender>,
}

/// Build the API router.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/auth", get(auth))
        .route("/sendmessage", post(send_message))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct AuthQuery {
    #[serde(default)]
    server_key: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    access_token: String,
    expires_in: u64,
}

async fn auth(State(state): State<Arc<ApiState>>, Query(query): Query<AuthQuery>) -> Response {
    if query.server_key.is_empty() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match state.directory.issue_token(&query.server_key) {
        Ok(Some(token)) => {
            let body =
                AuthResponse { expires_in: token.expires_in(), access_token: token.token };
            (StatusCode::OK, Json(body)).into_response()
        },
        Ok(None) => StatusCode::BAD_REQUEST.into_response(),
        Err(err) => {
            error!(error = %err, "failed to persist a rotated access token");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

#[derive(Debug, Default, Deserialize)]
struct RecipientSpec {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default, rename = "ibId")]
    ib_id: String,
    #[serde(default, rename = "userId")]
    user_id: String,
    #[serde(default, rename = "userGroup")]
    user_group: String,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationSpec {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    action: String,
    #[serde(default)]
    important: bool,
}

#[derive(Debug, Default, Deserialize)]
struct MessageSpec {
    #[serde(default)]
    topic: String,
    notification: Option<NotificationSpec>,
    #[serde(default)]
    data: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    recipient: Option<RecipientSpec>,
    message: Option<MessageSpec>,
}

async fn send_message(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let token = bearer_token(&headers);
    let app_id = match token.map(|t| state.directory.resolve_token(t)) {
        Some(TokenStatus::Valid { app_id }) => app_id,
        Some(TokenStatus::Expired) => return StatusCode::FORBIDDEN,
        Some(TokenStatus::Unknown) | None => return StatusCode::UNAUTHORIZED,
    };

    let Ok(request) = serde_json::from_slice::<SendMessageRequest>(&body) else {
        return StatusCode::BAD_REQUEST;
    };
    let Some((audience, message)) = validate(request) else {
        return StatusCode::BAD_REQUEST;
    };

    match audience {
        Audience::User { infobase_id, user_id } => {
            state.sender.send_to_user(&app_id, &infobase_id, &user_id, message).await;
        },
        Audience::Group { infobase_id, user_group } => {
            state.sender.send_to_group(&app_id, &infobase_id, &user_group, message).await;
        },
        Audience::All { infobase_id } => {
            state.sender.send_to_all(&app_id, &infobase_id, message).await;
        },
    }

    StatusCode::OK
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

/// Validate a request into an audience and a message.
///
/// Rules: recipient and message must both be present; the recipient
/// type must be exactly `user`, `group`, or `all`; `ibId` is always
/// required, plus `userId` or `userGroup` for their modes; and the
/// message must actually carry something (a topic, a displayable
/// notification, or data).
fn validate(request: SendMessageRequest) -> Option<(Audience, Message)> {
    let recipient = request.recipient?;
    let spec = request.message?;

    if recipient.ib_id.is_empty() {
        return None;
    }

    let audience = match recipient.kind.as_str() {
        "user" if !recipient.user_id.is_empty() => {
            Audience::User { infobase_id: recipient.ib_id, user_id: recipient.user_id }
        },
        "group" if !recipient.user_group.is_empty() => {
            Audience::Group { infobase_id: recipient.ib_id, user_group: recipient.user_group }
        },
        "all" => Audience::All { infobase_id: recipient.ib_id },
        _ => return None,
    };

    let message = Message {
        topic: spec.topic,
        notification: spec.notification.map(|n| Notification {
            title: n.title,
            body: n.body,
            icon: n.icon,
            action: n.action,
            important: n.important,
        }),
        data: spec.data,
    };

    let has_content = !message.topic.is_empty()
        || message.notification.as_ref().is_some_and(Notification::is_displayable)
        || !message.data.is_empty();
    if !has_content {
        return None;
    }

    Some((audience, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &str) -> SendMessageRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn validate_accepts_each_mode() {
        let (audience, message) = validate(request(
            r#"{"recipient": {"type": "user", "ibId": "ib1", "userId": "alice"},
               "message": {"topic": "t"}}"#,
        ))
        .unwrap();
        assert_eq!(
            audience,
            Audience::User { infobase_id: "ib1".to_owned(), user_id: "alice".to_owned() }
        );
        assert_eq!(message.topic, "t");

        let (audience, _) = validate(request(
            r#"{"recipient": {"type": "group", "ibId": "ib1", "userGroup": "ops"},
               "message": {"topic": "t"}}"#,
        ))
        .unwrap();
        assert_eq!(
            audience,
            Audience::Group { infobase_id: "ib1".to_owned(), user_group: "ops".to_owned() }
        );

        let (audience, _) = validate(request(
            r#"{"recipient": {"type": "all", "ibId": "ib1"},
               "message": {"data": {"k": "v"}}}"#,
        ))
        .unwrap();
        assert_eq!(audience, Audience::All { infobase_id: "ib1".to_owned() });
    }

    #[test]
    fn validate_rejects_missing_pieces() {
        // No recipient.
        assert!(validate(request(r#"{"message": {"topic": "t"}}"#)).is_none());
        // No message.
        assert!(validate(request(r#"{"recipient": {"type": "all", "ibId": "ib1"}}"#)).is_none());
        // Unknown type.
        assert!(
            validate(request(
                r#"{"recipient": {"type": "broadcast", "ibId": "ib1"}, "message": {"topic": "t"}}"#
            ))
            .is_none()
        );
        // Wrong case is rejected, not normalized.
        assert!(
            validate(request(
                r#"{"recipient": {"type": "User", "ibId": "ib1", "userId": "a"}, "message": {"topic": "t"}}"#
            ))
            .is_none()
        );
        // Missing ibId.
        assert!(
            validate(request(
                r#"{"recipient": {"type": "all"}, "message": {"topic": "t"}}"#
            ))
            .is_none()
        );
        // user without userId.
        assert!(
            validate(request(
                r#"{"recipient": {"type": "user", "ibId": "ib1"}, "message": {"topic": "t"}}"#
            ))
            .is_none()
        );
        // group without userGroup.
        assert!(
            validate(request(
                r#"{"recipient": {"type": "group", "ibId": "ib1"}, "message": {"topic": "t"}}"#
            ))
            .is_none()
        );
    }

    #[test]
    fn validate_requires_message_content() {
        // Entirely empty message.
        assert!(
            validate(request(
                r#"{"recipient": {"type": "all", "ibId": "ib1"}, "message": {}}"#
            ))
            .is_none()
        );
        // A notification without title or body does not count.
        assert!(
            validate(request(
                r#"{"recipient": {"type": "all", "ibId": "ib1"},
                    "message": {"notification": {"icon": "bell"}}}"#
            ))
            .is_none()
        );
        // One with a title does.
        assert!(
            validate(request(
                r#"{"recipient": {"type": "all", "ibId": "ib1"},
                    "message": {"notification": {"title": "hi"}}}"#
            ))
            .is_some()
        );
    }
}
