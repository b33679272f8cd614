//! # UDJ Provider
//!
//! Implements [`PlaylistServerClient`](core_playlist::PlaylistServerClient)
//! against the UDJ REST API.
//!
//! - `GET events/{id}/active_playlist` for the refresh
//! - `PUT events/{id}/active_playlist/songs` for batched add requests
//! - ticket and API version headers on every request
//! - status codes mapped onto `PlaylistError` kinds

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{UdjConnector, API_VERSION_HEADER, TICKET_HEADER};
pub use error::{Result, UdjError};
