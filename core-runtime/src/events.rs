//! # Event Bus System
//!
//! Provides an event-driven boundary between the publishing core and the host
//! using `tokio::sync::broadcast`. The host subscribes to render notices
//! (one per synced file, one summary per cycle, one blocking notice when a
//! cycle is aborted before any work starts) and to drive status indicators.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐
//! │ ChangeTracker├────────────>│           │   subscribe   ┌──────────────┐
//! └──────────────┘             │ EventBus  ├──────────────>│ Host notices │
//! ┌──────────────┐    emit     │ (broadcast│               └──────────────┘
//! │SyncCoordinat.├────────────>│  channel) │   subscribe   ┌──────────────┐
//! └──────────────┘             │           ├──────────────>│ Status bar   │
//!                              └───────────┘               └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PublishEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus.emit(CoreEvent::Publish(PublishEvent::Started {
//!     session_id: "session-1".to_string(),
//!     full: false,
//!     entries: 3,
//! })).ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Publish started");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber was too slow and missed `n`
//!   events. Non-fatal.
//! - **`RecvError::Closed`**: every sender has been dropped; treat as shutdown.
//!
//! Emitting with no subscribers returns an error that producers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// A full resync emits one event per vault file, so this is sized for bursts.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Pending change bookkeeping
    Changes(ChangeEvent),
    /// Publish cycle progress
    Publish(PublishEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Changes(e) => e.description(),
            CoreEvent::Publish(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Publish(PublishEvent::Aborted { .. }) => EventSeverity::Error,
            CoreEvent::Publish(PublishEvent::FileFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Publish(PublishEvent::FileSkipped { .. }) => EventSeverity::Warning,
            CoreEvent::Publish(PublishEvent::Completed { failed, .. }) if *failed > 0 => {
                EventSeverity::Warning
            }
            CoreEvent::Publish(PublishEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Publish(PublishEvent::FileSynced { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Text for a user-facing notice, if this event warrants one.
    pub fn notice(&self) -> Option<String> {
        match self {
            CoreEvent::Publish(e) => e.notice(),
            CoreEvent::Changes(_) => None,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Change Events
// ============================================================================

/// Changes to the pending change set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ChangeEvent {
    /// A path now has the given net status.
    Tracked {
        path: String,
        /// Encoded status (`created`, `modified`, `deleted`, `renamed:<old>`)
        status: String,
    },
    /// A path no longer has any pending status.
    Untracked { path: String },
}

impl ChangeEvent {
    fn description(&self) -> &str {
        match self {
            ChangeEvent::Tracked { .. } => "Change tracked",
            ChangeEvent::Untracked { .. } => "Change dropped",
        }
    }
}

// ============================================================================
// Publish Events
// ============================================================================

/// Why a cycle stopped before committing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AbortReason {
    /// Endpoint or access token missing
    NotConfigured,
    /// Remote rejected the access token
    Unauthorized,
    /// Health probe failed or timed out
    Unavailable,
    /// Flush before a full resync failed
    FlushFailed,
    /// The rebuild call failed
    CommitFailed,
    /// The cycle exceeded its configured time budget
    Timeout,
}

/// Events emitted while a publish cycle runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PublishEvent {
    /// Cycle passed its health probe and is dispatching entries.
    Started {
        session_id: String,
        /// Whole-vault resync rather than incremental publish
        full: bool,
        entries: usize,
    },
    /// One path was accepted by the remote.
    FileSynced {
        session_id: String,
        path: String,
        status: String,
        /// Bytes were sent; false on a dedup hit or a deletion
        uploaded: bool,
    },
    /// One path was skipped (e.g. deleted locally before it could be read).
    FileSkipped {
        session_id: String,
        path: String,
        reason: String,
    },
    /// One path failed; the rest of the cycle continues.
    FileFailed {
        session_id: String,
        path: String,
        message: String,
    },
    /// Manifest is being committed.
    Rebuilding {
        session_id: String,
        files: usize,
        clear_others: bool,
    },
    /// Commit succeeded.
    Completed {
        session_id: String,
        synced: usize,
        skipped: usize,
        failed: usize,
        uploaded: usize,
        duration_ms: u64,
    },
    /// Cycle stopped without committing.
    Aborted {
        reason: AbortReason,
        message: String,
    },
}

impl PublishEvent {
    fn description(&self) -> &str {
        match self {
            PublishEvent::Started { .. } => "Publish started",
            PublishEvent::FileSynced { .. } => "File synced",
            PublishEvent::FileSkipped { .. } => "File skipped",
            PublishEvent::FileFailed { .. } => "File sync failed",
            PublishEvent::Rebuilding { .. } => "Rebuilding remote index",
            PublishEvent::Completed { .. } => "Publish completed",
            PublishEvent::Aborted { .. } => "Publish aborted",
        }
    }

    fn notice(&self) -> Option<String> {
        match self {
            PublishEvent::Started { .. } => None,
            PublishEvent::FileSynced { path, .. } => Some(format!("Synced {}", path)),
            PublishEvent::FileSkipped { path, reason, .. } => {
                Some(format!("Skipped {}: {}", path, reason))
            }
            PublishEvent::FileFailed { path, message, .. } => {
                Some(format!("Failed to sync {}: {}", path, message))
            }
            PublishEvent::Rebuilding { .. } => {
                Some("Rebuilding your Jade service, please wait...".to_string())
            }
            PublishEvent::Completed { failed: 0, .. } => {
                Some("Your Jade service rebuilds successfully!".to_string())
            }
            PublishEvent::Completed { synced, failed, .. } => Some(format!(
                "Your Jade service rebuilt with {} file(s); {} failed",
                synced, failed
            )),
            PublishEvent::Aborted { message, .. } => Some(message.clone()),
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// When a subscriber falls behind by more than `capacity` events it
    /// receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
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
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let notices = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.notice().is_some());
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
