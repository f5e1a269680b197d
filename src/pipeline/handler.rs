//! Lazy delegating handler: the base decorator of every pipeline node.
//!
//! A node forwards each lifecycle and messaging operation to its inner
//! handler. The inner handler is not built with the node: it is produced by
//! the node's [`ContinuationFactory`] on first use, exactly once, even when
//! many tasks race to use the node for the first time.
//!
//! # Lazy Resolution
//!
//! ```text
//! caller A ──┐
//! caller B ──┼─► OnceCell::get_or_try_init ──► one runs the factory ──► all see the same Arc
//! caller C ──┘                              └─► the rest await ─────┘
//! ```
//!
//! A node without a continuation resolves to `None` and behaves as a
//! terminal no-op. If the factory fails, the error reaches the operation
//! that triggered resolution and the node stays unresolved, so the next
//! operation runs the factory again.
//!
//! # Default Behaviour
//!
//! | Operation | No inner handler | Inner handler |
//! |-----------|------------------|---------------|
//! | `open` | `Ok(())` | delegate |
//! | `close` | `Ok(())` | delegate once, then no-op |
//! | `receive*` | `Ok(None)` | delegate |
//! | `complete` / `abandon` / `reject` | `Ok(())` | delegate |
//! | `send_event*` | `Ok(())` | delegate |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::LockToken;
use crate::protocol::Message;

use super::context::PipelineContext;

// ============================================================================
// Types
// ============================================================================

/// Shared reference to a pipeline node.
pub type HandlerRef = Arc<dyn DelegatingHandler>;

/// Builds the next handler of a chain from the pipeline context.
pub type ContinuationFactory = Arc<dyn Fn(&PipelineContext) -> Result<HandlerRef> + Send + Sync>;

// ============================================================================
// HandlerCore
// ============================================================================

/// State shared by every pipeline node.
///
/// Holds the node's context, its continuation factory, the resolve-once
/// cell for the inner handler, and the closed/disposed flags.
pub struct HandlerCore {
    /// Context handed to the continuation factory.
    context: PipelineContext,
    /// Factory for the next node, set by the pipeline builder.
    continuation: RwLock<Option<ContinuationFactory>>,
    /// Inner handler, resolved at most once.
    inner: OnceCell<Option<HandlerRef>>,
    /// Set once the inner handler closed successfully.
    closed: AtomicBool,
    /// Set once the node has been disposed.
    disposed: AtomicBool,
}

impl fmt::Debug for HandlerCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCore")
            .field("has_continuation", &self.has_continuation())
            .field("resolved", &self.is_resolved())
            .field("closed", &self.is_closed())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// HandlerCore - Continuation
// ============================================================================

impl HandlerCore {
    /// Creates the state for a node built with `context`.
    #[must_use]
    pub fn new(context: PipelineContext) -> Self {
        Self {
            context,
            continuation: RwLock::new(None),
            inner: OnceCell::new(),
            closed: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    /// Returns the context this node was built with.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Sets the factory for the next node.
    ///
    /// Has no effect on an inner handler that is already resolved.
    pub fn set_continuation(&self, factory: ContinuationFactory) {
        if self.is_resolved() {
            warn!("Continuation set after inner handler was resolved; ignoring");
            return;
        }
        *self.continuation.write() = Some(factory);
    }

    /// Returns the factory for the next node.
    #[must_use]
    pub fn continuation(&self) -> Option<ContinuationFactory> {
        self.continuation.read().clone()
    }

    /// Returns `true` if a continuation factory is set.
    #[inline]
    #[must_use]
    pub fn has_continuation(&self) -> bool {
        self.continuation.read().is_some()
    }
}

// ============================================================================
// HandlerCore - Resolution
// ============================================================================

impl HandlerCore {
    /// Resolves the inner handler, running the continuation factory on first
    /// use.
    ///
    /// Concurrent callers wait for the single in-flight resolution and all
    /// receive the same handler.
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] if the node was disposed, including while the
    ///   factory was running; a handler built meanwhile is disposed
    /// - any error returned by the continuation factory; the node remains
    ///   unresolved and the next call retries
    pub async fn resolve(&self) -> Result<Option<HandlerRef>> {
        self.ensure_live()?;

        if let Some(inner) = self.inner.get() {
            return Ok(inner.clone());
        }

        let inner = self
            .inner
            .get_or_try_init(|| async {
                let Some(factory) = self.continuation() else {
                    trace!("No continuation, node is terminal");
                    return Ok(None);
                };

                match factory(&self.context) {
                    Ok(handler) => {
                        debug!("Inner handler resolved");
                        Ok(Some(handler))
                    }
                    Err(e) => {
                        warn!(error = %e, "Continuation factory failed");
                        Err(e)
                    }
                }
            })
            .await
            .cloned()?;

        // A dispose that ran during the factory call found nothing to release.
        if self.is_disposed() {
            if let Some(handler) = &inner {
                debug!("Node disposed during resolution, releasing inner handler");
                handler.dispose();
            }
            return Err(Error::Disposed);
        }

        Ok(inner)
    }

    /// Returns the inner handler if it has already been resolved.
    #[inline]
    #[must_use]
    pub fn resolved(&self) -> Option<HandlerRef> {
        self.inner.get().cloned().flatten()
    }

    /// Returns `true` if resolution has completed, with or without a handler.
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.inner.initialized()
    }
}

// ============================================================================
// HandlerCore - Lifecycle
// ============================================================================

impl HandlerCore {
    /// Returns `true` if the inner handler closed and no cleanup remains.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Records that the inner handler closed successfully.
    #[inline]
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Records that the inner handler opened, so a later close runs again.
    #[inline]
    pub fn mark_open(&self) {
        self.closed.store(false, Ordering::Release);
    }

    /// Returns `true` if the node has been disposed.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Fails with [`Error::Disposed`] once the node has been disposed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if [`dispose`](Self::dispose) was called.
    #[inline]
    pub fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    /// Disposes the node and its resolved inner handler.
    ///
    /// Returns `true` for the call that performed the disposal, `false` for
    /// every later call.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }

        if let Some(inner) = self.resolved() {
            inner.dispose();
        }

        trace!("Handler disposed");
        true
    }
}

// ============================================================================
// DelegatingHandler
// ============================================================================

/// A node of the connection pipeline.
///
/// Every operation has a pass-through default that forwards to
/// [`inner_handler`](Self::inner_handler). Implementors provide
/// [`core`](Self::core) and override only what they customize.
#[async_trait]
pub trait DelegatingHandler: Send + Sync {
    /// Returns the node's shared state.
    fn core(&self) -> &HandlerCore;

    /// Sets the factory producing the next node.
    fn set_continuation(&self, factory: ContinuationFactory) {
        self.core().set_continuation(factory);
    }

    /// Returns the inner handler, resolving it on first use.
    async fn inner_handler(&self) -> Result<Option<HandlerRef>> {
        self.core().resolve().await
    }

    /// Opens the connection.
    ///
    /// `explicit` is `true` when the application asked to open, `false` when
    /// the open is implied by another operation.
    async fn open(&self, explicit: bool) -> Result<()> {
        let Some(inner) = self.inner_handler().await? else {
            return Ok(());
        };
        inner.open(explicit).await?;
        self.core().mark_open();
        Ok(())
    }

    /// Closes the connection.
    ///
    /// Once the inner handler has closed successfully, later calls return
    /// `Ok(())` without reaching it again.
    async fn close(&self) -> Result<()> {
        let core = self.core();
        if core.is_closed() || core.is_disposed() {
            return Ok(());
        }

        let Some(inner) = self.inner_handler().await? else {
            return Ok(());
        };
        inner.close().await?;
        core.mark_closed();
        Ok(())
    }

    /// Receives the next message using the transport's default timeout.
    async fn receive(&self) -> Result<Option<Message>> {
        match self.inner_handler().await? {
            Some(inner) => inner.receive().await,
            None => Ok(None),
        }
    }

    /// Receives the next message, waiting at most `timeout`.
    async fn receive_with_timeout(&self, timeout: Duration) -> Result<Option<Message>> {
        match self.inner_handler().await? {
            Some(inner) => inner.receive_with_timeout(timeout).await,
            None => Ok(None),
        }
    }

    /// Settles a received message as processed.
    async fn complete(&self, token: &LockToken) -> Result<()> {
        match self.inner_handler().await? {
            Some(inner) => inner.complete(token).await,
            None => Ok(()),
        }
    }

    /// Returns a received message to the queue for redelivery.
    async fn abandon(&self, token: &LockToken) -> Result<()> {
        match self.inner_handler().await? {
            Some(inner) => inner.abandon(token).await,
            None => Ok(()),
        }
    }

    /// Dead-letters a received message.
    async fn reject(&self, token: &LockToken) -> Result<()> {
        match self.inner_handler().await? {
            Some(inner) => inner.reject(token).await,
            None => Ok(()),
        }
    }

    /// Sends one message.
    async fn send_event(&self, message: Message) -> Result<()> {
        match self.inner_handler().await? {
            Some(inner) => inner.send_event(message).await,
            None => Ok(()),
        }
    }

    /// Sends a batch of messages.
    async fn send_events(&self, messages: Vec<Message>) -> Result<()> {
        match self.inner_handler().await? {
            Some(inner) => inner.send_events(messages).await,
            None => Ok(()),
        }
    }

    /// Releases the inner handler. Safe to call more than once.
    fn dispose(&self) {
        self.core().dispose();
    }
}

// ============================================================================
// DefaultDelegatingHandler
// ============================================================================

/// Pass-through node with no behaviour of its own.
#[derive(Debug)]
pub struct DefaultDelegatingHandler {
    core: HandlerCore,
}

impl DefaultDelegatingHandler {
    /// Creates a pass-through node.
    #[inline]
    #[must_use]
    pub fn new(context: PipelineContext) -> Self {
        Self {
            core: HandlerCore::new(context),
        }
    }

    /// Returns a factory producing pass-through nodes.
    #[must_use]
    pub fn factory() -> ContinuationFactory {
        Arc::new(|context| Ok(Arc::new(Self::new(context.clone())) as HandlerRef))
    }
}

#[async_trait]
impl DelegatingHandler for DefaultDelegatingHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }
}

// ============================================================================
// Tests
// ============================================================================
