//! Message submission contract.

use async_trait::async_trait;

use crate::message::Message;

/// The core-facing API the HTTP layer calls into.
///
/// All three methods resolve the recipient set at submission time and
/// enqueue a dispatch task; none of them block on delivery or report its
/// outcome (fire-and-forget). A message addressed to an audience with no
/// connected members simply goes nowhere.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Deliver to every connection of `user_id` in `infobase_id`.
    async fn send_to_user(&self, app_id: &str, infobase_id: &str, user_id: &str, message: Message);

    /// Deliver to every connection of `user_group` in `infobase_id`.
    async fn send_to_group(
        &self,
        app_id: &str,
        infobase_id: &str,
        user_group: &str,
        message: Message,
    );

    /// Deliver to every connection in `infobase_id`, regardless of user
    /// or group.
    async fn send_to_all(&self, app_id: &str, infobase_id: &str, message: Message);
}
