//! Frame: the message type of the chat websocket.
//!
//! DESIGN
//! ======
//! - Flat data: payload is always a JSON object keyed by field name.
//! - Responses correlate to requests via `parent_id` and inherit the
//!   request's `session_id` and `syscall`.
//! - Every exchange is `request → item* → done` or `request → error`. The
//!   websocket handler routes on the syscall prefix (`chat:`, `session:`)
//!   and leaves `data` to the handler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::clock;
use crate::error::ErrorCode;

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

/// Frame data key for the retryable flag on error frames.
pub const FRAME_RETRYABLE: &str = "retryable";

pub type Data = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Request,
    Item,
    Done,
    Error,
    Cancel,
}

impl Status {
    /// Terminal statuses end a response stream.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Error | Status::Cancel)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Milliseconds since Unix epoch. Set automatically at construction.
    #[serde(default)]
    pub ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub syscall: String,
    pub status: Status,
    #[serde(default)]
    pub data: Data,
}

fn now_ms() -> i64 {
    i64::try_from(clock::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or(0)
}

impl Frame {
    pub fn request(syscall: impl Into<String>, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            ts: now_ms(),
            session_id: None,
            syscall: syscall.into(),
            status: Status::Request,
            data,
        }
    }

    #[must_use]
    pub fn item(&self, data: Data) -> Self {
        self.reply(Status::Item, data)
    }

    /// Terminal response carrying the final result.
    #[must_use]
    pub fn done_with(&self, data: Data) -> Self {
        self.reply(Status::Done, data)
    }

    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_MESSAGE.into(), Value::String(message.into()));
        self.reply(Status::Error, data)
    }

    /// Structured error response from a typed error.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_CODE.into(), Value::String(err.error_code().to_string()));
        data.insert(FRAME_MESSAGE.into(), Value::String(err.to_string()));
        data.insert(FRAME_RETRYABLE.into(), Value::Bool(err.retryable()));
        self.reply(Status::Error, data)
    }

    fn reply(&self, status: Status, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            session_id: self.session_id.clone(),
            syscall: self.syscall.clone(),
            status,
            data,
        }
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Everything before the first ':'.
    #[must_use]
    pub fn prefix(&self) -> &str {
        let Some((prefix, _)) = self.syscall.split_once(':') else {
            return &self.syscall;
        };
        prefix
    }

    /// Serialized value as a flat data map; non-object values land under
    /// `value`.
    #[must_use]
    pub fn data_of(value: &impl Serialize) -> Data {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => map,
            Ok(other) => Data::from_iter([("value".to_string(), other)]),
            Err(e) => Data::from_iter([(FRAME_MESSAGE.to_string(), Value::String(e.to_string()))]),
        }
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
