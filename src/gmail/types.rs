//! Gmail REST API wire types.

use serde::{Deserialize, Serialize};

/// Reference to a message as returned by `messages.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Opaque Gmail message id.
    pub id: String,
    /// Thread the message belongs to.
    #[serde(default)]
    pub thread_id: String,
}

/// One page of `messages.list` results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageListPage {
    /// Matching messages; Gmail omits the field when nothing matches.
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    /// Token for the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Message resource fetched with `format=metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    /// Opaque Gmail message id.
    pub id: String,
    /// Thread the message belongs to.
    #[serde(default)]
    pub thread_id: String,
    /// Labels currently applied to the message.
    #[serde(default)]
    pub label_ids: Vec<String>,
    /// Header-only payload.
    #[serde(default)]
    pub payload: Option<MessagePayload>,
}

/// Message payload restricted to headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Headers requested via `metadataHeaders`.
    #[serde(default)]
    pub headers: Vec<MessageHeader>,
}

/// A single RFC 5322 header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Header name as sent by the originating client.
    pub name: String,
    /// Raw header value.
    pub value: String,
}

impl MessageMetadata {
    /// Look up a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// Label resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Store-assigned label id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// `system` or `user`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Response body of `labels.list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelList {
    /// Every label in the mailbox.
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Visibility settings sent with `labels.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelVisibility {
    /// `labelShow`, `labelShowIfUnread` or `labelHide`.
    pub label_list_visibility: String,
    /// `show` or `hide`.
    pub message_list_visibility: String,
}

/// Response of `messages.send`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    /// Id of the outbound message.
    pub id: String,
    /// Thread the outbound message joined.
    #[serde(default)]
    pub thread_id: String,
}
