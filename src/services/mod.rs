//! Domain services used by HTTP and websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own platform access, analytics and persistence so route
//! handlers stay focused on request parsing and response shaping.

pub mod cache;
pub mod chat;
pub mod dashboard;
pub mod insights;
pub mod instagram;
pub mod persistence;
pub mod scheduler;
pub mod sentiment;
pub mod session_memory;
pub mod trends;

use serde::{Deserialize, Serialize};

/// `{success, data, error}` wrapper used by the dashboard-facing endpoints.
///
/// Failed branches still carry `data` (an empty or fallback value) so the
/// front end can render without special-casing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data, error: None }
    }

    pub fn failed(error: impl std::fmt::Display, fallback: T) -> Self {
        Self { success: false, data: fallback, error: Some(error.to_string()) }
    }
}

impl<T: Default> Envelope<T> {
    /// `Ok` → success, `Err` → failure with `T::default()` as data.
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failed(e, T::default()),
        }
    }
}
