//! Typed event bus.
//!
//! Core modules announce what happened on a shared `tokio::sync::broadcast`
//! channel instead of calling into each other: the mutation recorder emits
//! playback events, the reconciler emits sync progress, account management
//! emits session changes. Hosts subscribe to drive UI updates.
//!
//! ```text
//!  Recorder ──┐
//!  Reconciler ┼─ emit ─> EventBus ─ subscribe ─> host UI, tests, ...
//!  Accounts ──┘
//! ```
//!
//! Every subscriber gets its own receiver and sees every event emitted
//! after it subscribed. A subscriber that falls behind its buffer receives
//! `RecvError::Lagged(n)` and keeps going; `RecvError::Closed` means the
//! bus itself is gone and the consumer should exit. Emitting with no
//! subscribers is an error from `broadcast`, which callers routinely
//! ignore with `.ok()` — events are advisory, never load-bearing.
//!
//! Events are `serde`-tagged (`type`/`payload`) so hosts that want to ship
//! them over an FFI boundary can serialize them as-is.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! let bus = EventBus::new(100);
//! let mut sub = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::FavoriteChanged {
//!     user_id: "user-123".to_string(),
//!     item_id: "item-456".to_string(),
//!     favorite: true,
//! }))
//! .ok();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default per-subscriber buffer. Slower subscribers lag past this.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Server and user account events
    Account(AccountEvent),
    /// Sync engine events
    Sync(SyncEvent),
    /// Local playback-state mutation events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Account(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed {
                recoverable: false, ..
            }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Account(AccountEvent::SignedIn { .. }) => EventSeverity::Info,
            CoreEvent::Account(AccountEvent::SignedOut { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Account Events
// ============================================================================

/// Events related to media servers and user accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AccountEvent {
    /// A media server was registered.
    ServerAdded { server_id: String, name: String },
    /// A media server and everything stored for it were removed.
    ServerRemoved { server_id: String },
    /// User session established on a server.
    SignedIn { user_id: String, server_id: String },
    /// User session ended and the access token was cleared.
    SignedOut { user_id: String },
    /// User account and its playback states were removed.
    UserRemoved { user_id: String },
}

impl AccountEvent {
    fn description(&self) -> &str {
        match self {
            AccountEvent::ServerAdded { .. } => "Server registered",
            AccountEvent::ServerRemoved { .. } => "Server removed",
            AccountEvent::SignedIn { .. } => "User signed in",
            AccountEvent::SignedOut { .. } => "User signed out",
            AccountEvent::UserRemoved { .. } => "User account removed",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events related to playback-state synchronization with media servers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A sync pass was requested.
    Requested {
        /// What caused the request (e.g., "mutation", "foreground", "periodic", "manual").
        trigger: String,
    },
    /// Sync pass began for a user.
    Started { user_id: String },
    /// Sync pass finished for a user.
    Completed {
        user_id: String,
        /// Records acknowledged by the server and marked clean.
        pushed: u64,
        /// Records where the server's newer state was adopted locally.
        merged: u64,
        /// Records where the local state won the conflict and stays queued.
        retained: u64,
        /// Records left dirty for the next pass.
        requeued: u64,
        /// Records that failed with a non-transient error.
        failed: u64,
        duration_ms: u64,
    },
    /// Sync pass stopped on an error.
    Failed {
        user_id: String,
        message: String,
        /// Whether a later pass can be expected to succeed (e.g., server unreachable).
        recoverable: bool,
    },
    /// Pending sync work was cancelled.
    Cancelled {
        /// Why the work was cancelled (e.g., "sign-out").
        reason: String,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Requested { .. } => "Sync pass requested",
            SyncEvent::Started { .. } => "Sync pass started",
            SyncEvent::Completed { .. } => "Sync pass completed",
            SyncEvent::Failed { .. } => "Sync pass failed",
            SyncEvent::Cancelled { .. } => "Pending sync cancelled",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to local playback-state changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Played flag recorded locally.
    PlayedChanged {
        user_id: String,
        item_id: String,
        played: bool,
    },
    /// Favorite flag recorded locally.
    FavoriteChanged {
        user_id: String,
        item_id: String,
        favorite: bool,
    },
    /// Playback position recorded locally.
    PositionChanged {
        user_id: String,
        item_id: String,
        /// New resume position in ticks (100ns units).
        position_ticks: i64,
    },
    /// Conflict resolution adopted the server's newer state.
    StateMerged { user_id: String, item_id: String },
    /// State was refreshed from the server outside a sync pass.
    StateRefreshed { user_id: String, item_id: String },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::PlayedChanged { .. } => "Played flag changed",
            PlaybackEvent::FavoriteChanged { .. } => "Favorite flag changed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::StateMerged { .. } => "Server state merged",
            PlaybackEvent::StateRefreshed { .. } => "State refreshed from server",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Cloneable handle to the broadcast channel.
///
/// Clones share the same channel, so any module holding a clone can emit.
/// Each `subscribe()` call creates an independent receiver; past events
/// are not replayed to new subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus with the given per-subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a bus with [`DEFAULT_EVENT_BUFFER_SIZE`].
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all current subscribers.
    ///
    /// Returns how many subscribers received it, or an error when there
    /// are none. Emitters that don't care whether anyone is listening
    /// call `.ok()` on the result.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new independent subscriber.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of currently active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
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

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A receiver with an optional predicate applied on the consuming side.
///
/// Useful for hosts that only care about one event category:
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(100);
/// let mut sync_only =
///     EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Sync(_)));
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

    /// Restricts the stream to events matching `predicate`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Waits for the next event that passes the filter.
    ///
    /// Filtered-out events are consumed and skipped. Lag and closure
    /// surface exactly as they do on the underlying receiver.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Ok(event),
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    ///
    /// Returns `None` when no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => match &self.filter {
                    Some(filter) if !filter(&event) => continue,
                    _ => return Some(Ok(event)),
                },
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
