//! The message model and its wire serialization.
//!
//! A message is serialized into a compact JSON-shaped payload containing
//! only the fields that are actually present, then encrypted before it
//! leaves the server. The format is closed (producer and consumer are
//! both trusted components of this system), so values are concatenated
//! verbatim with no escaping. It is not a general-purpose JSON encoder
//! and must not be exposed to untrusted input expecting one.

use std::collections::BTreeMap;

/// The notification block of a message: what a client should show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    /// Short title line.
    pub title: String,
    /// Notification body text.
    pub body: String,
    /// Icon hint for the client.
    pub icon: String,
    /// Action the client should take when the notification is opened.
    pub action: String,
    /// Whether the client should present the notification prominently.
    pub important: bool,
}

impl Notification {
    /// Whether the block carries enough content to be delivered. A
    /// notification with neither title nor body is omitted from the
    /// serialized payload entirely.
    pub fn is_displayable(&self) -> bool {
        !self.title.is_empty() || !self.body.is_empty()
    }
}

/// A message submitted for delivery.
///
/// At least one of topic, notification, or data should be present for
/// the message to mean anything, but that is the submitting layer's
/// contract to enforce, not this type's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Topic the message belongs to; empty means no topic.
    pub topic: String,
    /// Optional notification block.
    pub notification: Option<Notification>,
    /// Arbitrary key/value payload. A sorted map keeps the serialized
    /// form deterministic.
    pub data: BTreeMap<String, String>,
}

impl Message {
    /// Serialize into the textual payload that gets encrypted and
    /// delivered.
    ///
    /// Shape: `topic` if non-empty; `notification` only if it is
    /// displayable, omitting empty sub-fields but always carrying
    /// `important`; `data` only if non-empty, skipping empty-valued
    /// pairs. A message with nothing present serializes as `{}`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = String::with_capacity(512);
        out.push('{');

        let mut need_separator = false;

        if !self.topic.is_empty() {
            push_string_field(&mut out, "topic", &self.topic);
            need_separator = true;
        }

        if let Some(notification) = &self.notification {
            if notification.is_displayable() {
                if need_separator {
                    out.push_str(", ");
                }
                serialize_notification(&mut out, notification);
                need_separator = true;
            }
        }

        if !self.data.is_empty() {
            if need_separator {
                out.push_str(", ");
            }
            serialize_data(&mut out, &self.data);
        }

        out.push('}');
        out.into_bytes()
    }
}

fn serialize_notification(out: &mut String, notification: &Notification) {
    out.push_str("\"notification\": {");

    for (name, value) in [
        ("title", &notification.title),
        ("body", &notification.body),
        ("icon", &notification.icon),
        ("action", &notification.action),
    ] {
        if !value.is_empty() {
            push_string_field(out, name, value);
            out.push_str(", ");
        }
    }

    out.push_str("\"important\": ");
    out.push_str(if notification.important { "true" } else { "false" });
    out.push('}');
}

fn serialize_data(out: &mut String, data: &BTreeMap<String, String>) {
    out.push_str("\"data\": {");

    let mut first = true;
    for (key, value) in data {
        if value.is_empty() {
            continue;
        }
        if first {
            first = false;
        } else {
            out.push_str(", ");
        }
        push_string_field(out, key, value);
    }

    out.push('}');
}

fn push_string_field(out: &mut String, name: &str, value: &str) {
    out.push('"');
    out.push_str(name);
    out.push_str("\": \"");
    out.push_str(value);
    out.push('"');
}
