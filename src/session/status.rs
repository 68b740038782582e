use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

/// How long a message stays visible before it expires on its own.
pub const MESSAGE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusMessage {
    pub id: String,
    pub text: String,
    pub kind: StatusKind,
}

/// Ephemeral user-facing notifications. Messages are kept in insertion
/// order and expire through an explicitly spawned timer, so they disappear
/// whether or not anyone is watching the list.
#[derive(Debug, Clone, Default)]
pub struct StatusCenter {
    messages: Arc<Mutex<Vec<StatusMessage>>>,
}

impl StatusCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows a message and schedules its removal after [`MESSAGE_TTL`].
    /// Returns the message id for manual dismissal.
    pub fn show(&self, text: impl Into<String>, kind: StatusKind) -> String {
        let id = Uuid::new_v4().to_string();
        let message = StatusMessage {
            id: id.clone(),
            text: text.into(),
            kind,
        };
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }

        let center = self.clone();
        let expiring = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(MESSAGE_TTL).await;
            center.remove(&expiring);
        });

        id
    }

    /// Idempotent: removing an id that is already gone is a no-op.
    pub fn remove(&self, id: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.retain(|m| m.id != id);
        }
    }

    pub fn messages(&self) -> Vec<StatusMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}
