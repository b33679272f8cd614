//! # Authentication Module
//!
//! UDJ ticket authentication.
//!
//! ## Overview
//!
//! The UDJ server authenticates requests with an opaque ticket hash sent in the
//! `X-Udj-Ticket-Hash` header. This crate obtains tickets by posting the user's
//! credentials to the `auth` endpoint, caches them in the host secure store and
//! exposes them to the synchronizer through [`CredentialProvider`].
//!
//! ## Features
//!
//! - Interactive sign-in through a host-supplied [`InteractiveAuthenticator`]
//! - Cancellation and timeout of the credential prompt
//! - Per-account prompt serialization
//! - Ticket invalidation after the server rejects a ticket
//! - Auth event emission

pub mod credential;
pub mod error;
pub mod manager;
pub mod ticket_store;
pub mod types;

pub use credential::{CredentialProvider, InteractiveAuthenticator};
pub use error::{AuthError, Result};
pub use manager::{TicketManager, TicketManagerConfig};
pub use ticket_store::TicketStore;
pub use types::{AccountId, Credentials, Ticket};
