//! Two-phase safe-deletion protocol.
//!
//! Evaluated per Added/Modified notification; Deleted notifications bypass
//! it, since by then the object is already gone. Returning `true` means the
//! protocol handled the event and the caller must not reconcile it further;
//! `false` means normal reconciliation proceeds.
//!
//! | object condition | action | returns |
//! |---|---|---|
//! | not deleting, finalizer absent | append finalizer, write back | `true` |
//! | not deleting, finalizer present | — | `false` |
//! | deleting, finalizer present | run `delete_action`, remove finalizer, write back | `true` |
//! | deleting, finalizer absent | no-op, object is fully released | `true` |
//!
//! `delete_action` has at-least-once semantics: a crash between its
//! completion and the finalizer-removal write landing forces a retry on the
//! next Modified notification.

use std::future::Future;

use crate::resource::ObjectMetadata;
use crate::status::StatusUpdater;
use crate::ResourceEvent;
use crate::ResourceEventType;
use crate::Result;

pub(crate) async fn handle_resource_finalizer<F, Fut>(
    updater: &StatusUpdater,
    event: &ResourceEvent,
    finalizer: &str,
    delete_action: F,
) -> Result<bool>
where
    F: FnOnce(ResourceEvent) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if event.event_type == ResourceEventType::Deleted {
        return Ok(false);
    }
    let Some(metadata) = ObjectMetadata::of(&event.object) else {
        return Ok(false);
    };

    let finalizers = metadata.finalizers.unwrap_or_default();
    // Exact, case-sensitive match.
    let finalizer_present = finalizers.iter().any(|f| f == finalizer);

    if metadata.deletion_timestamp.is_none() && !finalizer_present {
        // Make sure our finalizer is added when the resource is first
        // created. A follow-up Modified event arrives once the write lands.
        let mut finalizers = finalizers;
        finalizers.push(finalizer.to_string());
        updater.set_finalizers(&event.identity, finalizers).await;
        Ok(true)
    } else if metadata.deletion_timestamp.is_some() {
        if finalizer_present {
            // Marked for deletion with our finalizer still set: run the
            // delete action, then clear only our own entry so the server
            // can finalize the deletion.
            delete_action(event.clone()).await?;
            let finalizers = finalizers.into_iter().filter(|f| f != finalizer).collect();
            updater.set_finalizers(&event.identity, finalizers).await;
        }
        // Marked for deletion; never process it further.
        Ok(true)
    } else {
        Ok(false)
    }
}
