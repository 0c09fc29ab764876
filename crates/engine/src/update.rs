//! The privileged metadata/tags patch.
//!
//! Events are immutable except for two annotation fields: `metadata`
//! (shallow-merged, existing keys overwritten) and `tags` (replaced
//! wholesale). Neither field is indexed, so the patch rewrites only the
//! primary record and every index row stays valid.

use std::collections::BTreeMap;

use papertrail_store::{StorageBackend, WriteTransaction};
use papertrail_types::EventId;

use crate::error::{EventNotFoundSnafu, Result};
use crate::event_store::EventStore;

/// The fields a privileged caller may amend on a stored event.
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct EventPatch {
    /// Entries merged into the event's metadata; existing keys are
    /// overwritten, others kept.
    pub metadata: Option<BTreeMap<String, String>>,
    /// Replacement tag list.
    pub tags: Option<Vec<String>>,
}

impl EventPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_none() && self.tags.is_none()
    }
}

/// Applies a patch to a stored event.
///
/// # Errors
///
/// Returns [`EngineError::EventNotFound`](crate::EngineError::EventNotFound)
/// when no event has the given id, and storage or codec errors from the
/// underlying store.
pub fn update_event<B: StorageBackend>(
    txn: &mut WriteTransaction<'_, B>,
    id: EventId,
    patch: EventPatch,
) -> Result<()> {
    let Some(mut event) = EventStore::get_pending(txn, id)? else {
        return EventNotFoundSnafu { id }.fail();
    };
    if patch.is_empty() {
        return Ok(());
    }

    if let Some(entries) = patch.metadata {
        event.metadata.extend(entries);
    }
    if let Some(tags) = patch.tags {
        event.tags = tags;
    }
    EventStore::overwrite_primary(txn, &event)?;
    tracing::debug!(event_id = %id, "patched event annotations");
    Ok(())
}
