//! Typed notifications from the sync core to the host.
//!
//! Everything goes through one `tokio::sync::broadcast` channel wrapped by
//! [`EventBus`]. Publishing never fails: with nobody listening the event is
//! simply dropped. A subscriber that falls more than the channel capacity
//! behind gets [`RecvError::Lagged`] once and then resumes with the oldest
//! retained event.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaylistEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut events = bus.subscribe();
//!
//! bus.publish(CoreEvent::Playlist(PlaylistEvent::ActivePlaylistRefreshed {
//!     event_id: 42,
//!     entry_count: 3,
//! }));
//!
//! assert!(matches!(events.recv().await, Ok(CoreEvent::Playlist(_))));
//! # }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::TryRecvError};

pub use tokio::sync::broadcast::error::RecvError;
pub use tokio::sync::broadcast::Receiver;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Serialized as `{"type": "Sync", "payload": {"event": "Failed", ...}}`
/// so hosts can dispatch on two string tags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Auth(AuthEvent),
    Sync(SyncEvent),
    Playlist(PlaylistEvent),
}

impl CoreEvent {
    pub fn severity(&self) -> EventSeverity {
        use AuthEvent::*;
        match self {
            Self::Auth(AuthError { .. }) | Self::Sync(SyncEvent::Failed { .. }) => {
                EventSeverity::Error
            }
            Self::Auth(TicketInvalidated { .. }) => EventSeverity::Warning,
            Self::Auth(CredentialsRequired { .. } | SignedIn { .. })
            | Self::Sync(SyncEvent::Completed { .. })
            | Self::Playlist(PlaylistEvent::AddRequestsSynced { .. }) => EventSeverity::Info,
            Self::Sync(SyncEvent::Started { .. })
            | Self::Playlist(PlaylistEvent::ActivePlaylistRefreshed { .. }) => {
                EventSeverity::Debug
            }
        }
    }

    /// The UDJ event the notification concerns, when there is one.
    pub fn event_id(&self) -> Option<i64> {
        match self {
            Self::Auth(_) => None,
            Self::Sync(SyncEvent::Started { event_id, .. })
            | Self::Sync(SyncEvent::Completed { event_id, .. }) => Some(*event_id),
            Self::Sync(SyncEvent::Failed { event_id, .. }) => *event_id,
            Self::Playlist(PlaylistEvent::AddRequestsSynced { event_id, .. })
            | Self::Playlist(PlaylistEvent::ActivePlaylistRefreshed { event_id, .. }) => {
                Some(*event_id)
            }
        }
    }
}

impl fmt::Display for CoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(AuthEvent::CredentialsRequired { account_id }) => {
                write!(f, "credentials required for {account_id}")
            }
            Self::Auth(AuthEvent::SignedIn { account_id, user_id }) => {
                write!(f, "{account_id} signed in as user {user_id}")
            }
            Self::Auth(AuthEvent::TicketInvalidated { account_id }) => {
                write!(f, "ticket for {account_id} invalidated")
            }
            Self::Auth(AuthEvent::AuthError { message, .. }) => {
                write!(f, "authentication failed: {message}")
            }
            Self::Sync(SyncEvent::Started { operation, event_id, .. }) => {
                write!(f, "{operation} started for event {event_id}")
            }
            Self::Sync(SyncEvent::Completed { operation, event_id }) => {
                write!(f, "{operation} completed for event {event_id}")
            }
            Self::Sync(SyncEvent::Failed { operation, kind, message, .. }) => {
                write!(f, "{operation} failed ({kind}): {message}")
            }
            Self::Playlist(PlaylistEvent::AddRequestsSynced { event_id, request_ids }) => {
                write!(f, "{} add requests synced for event {event_id}", request_ids.len())
            }
            Self::Playlist(PlaylistEvent::ActivePlaylistRefreshed { event_id, entry_count }) => {
                write!(f, "active playlist of event {event_id} now has {entry_count} entries")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// No usable ticket; the host authenticator is about to be prompted.
    CredentialsRequired { account_id: String },
    SignedIn { account_id: String, user_id: i64 },
    /// Ticket dropped after a 401 or an explicit sign out.
    TicketInvalidated { account_id: String },
    AuthError {
        account_id: Option<String>,
        message: String,
        recoverable: bool,
    },
}

/// Lifecycle of one synchronizer invocation. `operation` carries the wire
/// name, e.g. `SYNC_ADD_REQUESTS`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    Started {
        operation: String,
        account_id: String,
        event_id: i64,
    },
    Completed {
        operation: String,
        event_id: i64,
    },
    Failed {
        operation: String,
        /// `None` when the command was rejected for lacking an event id.
        event_id: Option<i64>,
        kind: String,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaylistEvent {
    AddRequestsSynced {
        event_id: i64,
        request_ids: Vec<i64>,
    },
    ActivePlaylistRefreshed {
        event_id: i64,
        entry_count: usize,
    },
}

/// Cloneable publisher handle; every clone feeds the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Deliver `event` to current subscribers and return how many there were.
    pub fn publish(&self, event: CoreEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// New receiver. Events published before this call are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

type Predicate = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that can skip events the host is not interested in.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
///
/// let bus = EventBus::default();
/// let problems = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    predicate: Option<Predicate>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            predicate: None,
        }
    }

    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Some(Box::new(predicate)),
            ..self
        }
    }

    fn wanted(&self, event: &CoreEvent) -> bool {
        self.predicate.as_ref().map_or(true, |keep| keep(event))
    }

    /// Next wanted event. Lag and closure are surfaced as [`RecvError`].
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wanted(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv); `None` when nothing
    /// wanted is buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(skipped)) => return Some(Err(RecvError::Lagged(skipped))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.wanted(&event) {
                return Some(Ok(event));
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.predicate.is_some())
            .finish()
    }
}
