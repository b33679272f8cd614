//! UDJ API connector
//!
//! Implements `PlaylistServerClient` over the host `HttpClient` bridge.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use core_playlist::{EventId, PendingBatch, PlaylistEntry, PlaylistServerClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, UdjError};
use crate::types::{ActivePlaylistResponse, AddSongRequest, QueuedSong};

pub const TICKET_HEADER: &str = "X-Udj-Ticket-Hash";
pub const API_VERSION_HEADER: &str = "X-Udj-Api-Version";

/// UDJ API connector
///
/// ```ignore
/// let connector = UdjConnector::new(http_client, "https://udjplayer.com:4897/udj/", "0.6");
/// let playlist = connector.fetch_active_playlist(EventId(7), &ticket).await?;
/// ```
pub struct UdjConnector {
    http_client: Arc<dyn HttpClient>,
    /// Always ends with `/`
    base_url: String,
    api_version: String,
    request_timeout: Option<Duration>,
}

impl UdjConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            http_client,
            base_url,
            api_version: api_version.into(),
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn active_playlist_url(&self, event_id: EventId) -> String {
        format!("{}events/{}/active_playlist", self.base_url, event_id)
    }

    fn request(&self, method: HttpMethod, url: String, token: &str) -> HttpRequest {
        let request = HttpRequest::new(method, url)
            .header(TICKET_HEADER, token)
            .header(API_VERSION_HEADER, self.api_version.clone())
            .header("Accept", "application/json");

        match self.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    /// Map a received response onto the error taxonomy.
    fn check_status(response: &HttpResponse) -> Result<()> {
        if response.is_success() {
            return Ok(());
        }

        let message = response
            .text()
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        if response.status == 401 {
            let challenge = response.header("WWW-Authenticate").unwrap_or("ticket-hash");
            warn!(challenge, "Server rejected ticket");
            return Err(UdjError::TicketRejected(format!(
                "401 ({}): {}",
                challenge, message
            )));
        }

        warn!(status = response.status, "UDJ API returned an error");
        Err(UdjError::ApiError {
            status_code: response.status,
            message,
        })
    }

    fn convert_entry(queued: QueuedSong) -> PlaylistEntry {
        PlaylistEntry {
            library_track_id: queued.song.id.into(),
            title: queued.song.title,
            artist: queued.song.artist,
            album: queued.song.album,
            duration_secs: queued.song.duration,
            upvotes: queued.upvoters.len() as u32,
            downvotes: queued.downvoters.len() as u32,
            time_added: queued.time_added,
            adder_id: queued.adder.id,
            adder_username: queued.adder.username,
        }
    }

    #[instrument(skip(self, token), fields(event_id = %event_id))]
    async fn get_active_playlist(
        &self,
        event_id: EventId,
        token: &str,
    ) -> Result<Vec<PlaylistEntry>> {
        let request = self.request(HttpMethod::Get, self.active_playlist_url(event_id), token);

        let response = self
            .http_client
            .execute(request)
            .await?;

        Self::check_status(&response)?;

        let body: ActivePlaylistResponse = response
            .json()
            .map_err(|e| UdjError::ParseError(e.to_string()))?;

        let entries: Vec<PlaylistEntry> = body
            .active_playlist
            .into_iter()
            .map(Self::convert_entry)
            .collect();

        debug!(entries = entries.len(), "Fetched active playlist");
        Ok(entries)
    }

    #[instrument(skip(self, batch, token), fields(event_id = %event_id, batch_size = batch.len()))]
    async fn put_add_requests(
        &self,
        batch: &PendingBatch,
        event_id: EventId,
        token: &str,
    ) -> Result<()> {
        let payload: Vec<AddSongRequest> = batch
            .iter()
            .map(|(request_id, track_id)| AddSongRequest {
                lib_id: track_id.value(),
                client_request_id: request_id.value(),
            })
            .collect();

        let url = format!("{}/songs", self.active_playlist_url(event_id));
        let request = self
            .request(HttpMethod::Put, url, token)
            .json(&payload)
            .map_err(|e| UdjError::RequestError(e.to_string()))?;

        // Exactly one remote call per submission; the caller owns retries.
        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::no_retry())
            .await?;

        Self::check_status(&response)?;

        info!(status = response.status, "Add requests accepted");
        Ok(())
    }
}

#[async_trait]
impl PlaylistServerClient for UdjConnector {
    async fn fetch_active_playlist(
        &self,
        event_id: EventId,
        token: &str,
    ) -> core_playlist::Result<Vec<PlaylistEntry>> {
        Ok(self.get_active_playlist(event_id, token).await?)
    }

    async fn submit_add_requests(
        &self,
        batch: &PendingBatch,
        event_id: EventId,
        token: &str,
    ) -> core_playlist::Result<()> {
        Ok(self.put_add_requests(batch, event_id, token).await?)
    }
}
