//! Background Execution and Task Scheduling
//!
//! Provides platform-aware background task scheduling with de-duplicating
//! enqueue semantics.

use futures::future::BoxFuture;
use std::sync::Arc;

use crate::error::Result;

/// Task execution constraints
#[derive(Debug, Clone)]
pub struct TaskConstraints {
    /// Require WiFi connection
    pub requires_wifi: bool,
    /// Require any network connection
    pub requires_network: bool,
    /// Require device to be charging
    pub requires_charging: bool,
    /// Require device to be idle
    pub requires_idle: bool,
}

impl Default for TaskConstraints {
    fn default() -> Self {
        Self {
            requires_wifi: false,
            requires_network: true,
            requires_charging: false,
            requires_idle: false,
        }
    }
}

/// Policy applied when a unit of work is enqueued under a logical name that
/// already has a pending or running unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacePolicy {
    /// Cancel the existing unit and enqueue the new one. Many requests
    /// therefore collapse into the single most recent pending unit.
    #[default]
    Replace,
    /// Keep the existing unit and drop the new request.
    Keep,
}

/// Task execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task is scheduled but not yet running (constraints unmet or queued)
    Scheduled,
    /// Task is currently executing
    Running,
    /// Task completed successfully
    Completed,
    /// Task failed
    Failed,
    /// Task was cancelled
    Cancelled,
}

/// Unit of work executed by a [`BackgroundExecutor`].
///
/// Handlers are registered once per logical name and invoked each time an
/// enqueued unit under that name becomes runnable.
pub type TaskHandler = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Background task executor trait
///
/// Abstracts platform-specific background work scheduling:
/// - **iOS**: BGTaskScheduler (requires user opt-in)
/// - **Android**: WorkManager (respects Doze mode)
/// - **Desktop**: Tokio tasks with constraint polling
///
/// Work is keyed by a caller-chosen logical name. At most one unit per name
/// is pending or running at a time; the [`ReplacePolicy`] decides what an
/// enqueue does when a unit already exists. The executor owns
/// retry-on-constraint-unmet semantics: a unit whose constraints are not met
/// waits until they are (e.g. network connectivity returns) before running.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::background::{BackgroundExecutor, ReplacePolicy, TaskConstraints};
///
/// async fn kick_sync(executor: &dyn BackgroundExecutor) -> Result<()> {
///     executor
///         .enqueue("playback-state-sync", TaskConstraints::default(), ReplacePolicy::Replace)
///         .await
/// }
/// ```
#[async_trait::async_trait]
pub trait BackgroundExecutor: Send + Sync {
    /// Register the handler invoked for units enqueued under `name`.
    ///
    /// Re-registering a name replaces the previous handler.
    async fn register_task_handler(&self, name: &str, handler: TaskHandler) -> Result<()>;

    /// Enqueue a unit of work under a logical name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BridgeError::NotAvailable`] when no handler is
    /// registered for `name` or the platform cannot schedule background work.
    async fn enqueue(
        &self,
        name: &str,
        constraints: TaskConstraints,
        replace: ReplacePolicy,
    ) -> Result<()>;

    /// Cancel the pending or running unit under `name`, if any.
    async fn cancel(&self, name: &str) -> Result<()>;

    /// Get the status of the most recent unit under `name`.
    async fn task_status(&self, name: &str) -> Result<Option<TaskStatus>>;

    /// Check if background execution is available
    ///
    /// Some platforms may not support background execution.
    async fn is_available(&self) -> bool {
        true
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Application is in the foreground and active
    Foreground,
    /// Application is in the background
    Background,
    /// Application is being suspended
    Suspended,
}

/// Lifecycle observer trait
///
/// Notifies the core about app lifecycle transitions so it can:
/// - Request a sync pass when the app returns to the foreground
/// - Pause expensive operations when backgrounded
///
/// # Platform Support
///
/// - **iOS**: UIApplication lifecycle notifications
/// - **Android**: Activity/Application lifecycle callbacks
/// - **Desktop**: Window focus/minimize events (less critical)
#[async_trait::async_trait]
pub trait LifecycleObserver: Send + Sync {
    /// Get current lifecycle state
    async fn get_state(&self) -> Result<LifecycleState>;

    /// Subscribe to lifecycle state changes
    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>>;
}

/// Stream of lifecycle state changes
#[async_trait::async_trait]
pub trait LifecycleChangeStream: Send {
    /// Get the next lifecycle state update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<LifecycleState>;
}
