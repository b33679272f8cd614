//! Contract for the remote playlist API.

use crate::error::Result;
use crate::models::{EventId, PendingBatch, PlaylistEntry};
use async_trait::async_trait;

/// Remote side of the synchronizer: fetches the active playlist and submits
/// queued add requests.
///
/// Implementations map a rejected token to
/// [`PlaylistError::AuthRejected`](crate::PlaylistError::AuthRejected),
/// transport failures to `Network` and malformed replies to `Protocol`.
#[async_trait]
pub trait PlaylistServerClient: Send + Sync {
    /// Current active playlist of `event_id`, in server order.
    async fn fetch_active_playlist(
        &self,
        event_id: EventId,
        token: &str,
    ) -> Result<Vec<PlaylistEntry>>;

    /// Submit the whole batch in one remote call.
    ///
    /// Each request id travels with its track so the server can drop
    /// duplicates of a batch that was already accepted.
    async fn submit_add_requests(
        &self,
        batch: &PendingBatch,
        event_id: EventId,
        token: &str,
    ) -> Result<()>;
}
