use serde::Serialize;

/// What a completed operation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The active playlist cache was replaced with `entries` entries.
    Refreshed { entries: usize },
    /// `submitted` add requests were accepted and marked synced, then the
    /// cache was refreshed with `entries` entries.
    Synced { submitted: usize, entries: usize },
    /// No add request was pending; nothing was sent.
    NothingToSync,
    /// The command named an operation this core does not know.
    Ignored,
}
