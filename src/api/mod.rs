//! Typed client for the birdspot backend.
//!
//! [`ApiClient`] attaches the stored access token to every request and
//! recovers from one expired token per request by refreshing it (see
//! [`client`]). Endpoint wrappers live in [`birds`] and [`account`].

pub mod account;
pub mod birds;
pub mod client;

pub use account::FavoriteToggle;
pub use birds::{SearchOrigin, SpeciesQuery};
pub use client::ApiClient;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 that survived the refresh attempt, or no session to refresh.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    /// Rejected before anything was sent.
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Status { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn invalid(err: impl std::fmt::Display) -> Self {
        Self::Invalid(err.to_string())
    }
}
