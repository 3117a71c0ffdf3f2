//! Label Ensurer: obtain the marker label id, creating the label once.

use tracing::{info, warn};

use crate::config::LabelConfig;
use crate::gmail::{LabelVisibility, MailStore};
use crate::{AppError, Result};

/// Return the id of the label named `label.name`, creating it if absent.
///
/// Creation is attempted first. A conflict means the label already exists,
/// in which case the id is looked up by exact name match.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the store reports a conflict but lists no
/// label with that name, and propagates any other store failure unchanged.
pub async fn ensure_label(store: &dyn MailStore, label: &LabelConfig) -> Result<String> {
    let visibility = LabelVisibility {
        label_list_visibility: label.label_list_visibility.clone(),
        message_list_visibility: label.message_list_visibility.clone(),
    };

    match store.create_label(&label.name, &visibility).await {
        Ok(created) => {
            info!(label = %label.name, label_id = %created.id, "created marker label");
            Ok(created.id)
        }
        Err(AppError::Conflict(reason)) => {
            info!(label = %label.name, %reason, "marker label exists, looking it up");
            find_label_id(store, &label.name).await
        }
        Err(err) => {
            warn!(label = %label.name, %err, "marker label creation failed");
            Err(err)
        }
    }
}

async fn find_label_id(store: &dyn MailStore, name: &str) -> Result<String> {
    store
        .list_labels()
        .await?
        .into_iter()
        .find(|l| l.name == name)
        .map(|l| l.id)
        .ok_or_else(|| AppError::NotFound(format!("label {name:?} reported as existing but not listed")))
}
