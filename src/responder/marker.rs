//! Marker Applier: label the handled message and take it out of the inbox.

use tracing::info;

use crate::gmail::{MailStore, INBOX_LABEL};
use crate::Result;

/// Add `label_id` and remove `INBOX` in one modify request.
///
/// # Errors
///
/// Propagates the store failure; the message then stays eligible for the
/// next search.
pub async fn apply_marker(store: &dyn MailStore, message_id: &str, label_id: &str) -> Result<()> {
    let add = [label_id.to_owned()];
    let remove = [INBOX_LABEL.to_owned()];
    store.modify_labels(message_id, &add, &remove).await?;
    info!(message_id, label_id, "marker applied");
    Ok(())
}
