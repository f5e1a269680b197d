//! Protocol routing: open through the first transport that works.
//!
//! The routing handler owns the ordered transport settings list from its
//! context. On `open` it builds a fresh underlying handler for each entry in
//! turn, exposing the selected [`TransportSettings`] in the context passed to
//! the continuation factory, and opens it.
//!
//! # Open State Machine
//!
//! ```text
//! Selecting(i) ──factory──► Attempting(i) ──ok──────────► Succeeded (bind handler)
//!      ▲                         │
//!      │                         ├─retryable, i < last──► close ─► Selecting(i+1)
//!      └─────────────────────────┤
//!                                ├─retryable, i = last──► close ─► Exhausted
//!                                └─fatal────────────────► close ─► FailedFatal
//! ```
//!
//! - `Exhausted` surfaces [`Error::FallbackExhausted`].
//! - `FailedFatal` surfaces the attempt's error unchanged.
//! - Closing a failed attempt is best effort; its error is only logged.
//!
//! Attempts run one at a time and concurrent `open` calls are serialized.
//! A repeated `open` first closes and releases the handler bound by the
//! previous one, so a failed reopen leaves nothing bound. Every other
//! operation forwards to the bound handler, or is a no-op while none is
//! bound.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result, RetryPolicy};
use crate::pipeline::{ContinuationFactory, DelegatingHandler, HandlerCore, HandlerRef, PipelineContext};

use super::settings::{TransportSettings, TransportType};

// ============================================================================
// Types
// ============================================================================

/// Handler bound by a successful open.
struct Binding {
    /// Index into the settings list.
    index: usize,
    /// The opened underlying handler.
    handler: HandlerRef,
}

// ============================================================================
// ProtocolRoutingHandler
// ============================================================================

/// Pipeline node that opens through an ordered list of transports.
///
/// # Context
///
/// | Type | Required | Use |
/// |------|----------|-----|
/// | `Vec<TransportSettings>` | yes | fallback order, first preferred |
/// | [`RetryPolicy`] | no | classification of composite errors |
pub struct ProtocolRoutingHandler {
    core: HandlerCore,
    /// Fallback order, fixed at construction.
    routes: Vec<TransportSettings>,
    policy: RetryPolicy,
    bound: RwLock<Option<Binding>>,
    /// Serializes `open` so only one attempt is in flight.
    open_lock: AsyncMutex<()>,
}

impl fmt::Debug for ProtocolRoutingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolRoutingHandler")
            .field("routes", &self.routes)
            .field("policy", &self.policy)
            .field("active", &self.active_transport())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ProtocolRoutingHandler - Constructor
// ============================================================================

impl ProtocolRoutingHandler {
    /// Creates a routing handler from the settings list in `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the list is missing, empty, or holds
    /// invalid settings.
    pub fn new(context: PipelineContext) -> Result<Self> {
        let routes: Vec<TransportSettings> = context.require()?;
        if routes.is_empty() {
            return Err(Error::config(
                "protocol routing requires at least one transport setting",
            ));
        }
        for settings in &routes {
            settings.validate()?;
        }

        let policy = context.get_or(RetryPolicy::default());
        debug!(routes = routes.len(), ?policy, "Protocol routing handler created");

        Ok(Self {
            core: HandlerCore::new(context),
            routes,
            policy,
            bound: RwLock::new(None),
            open_lock: AsyncMutex::new(()),
        })
    }

    /// Returns a factory producing routing handlers.
    #[must_use]
    pub fn factory() -> ContinuationFactory {
        Arc::new(|context| Ok(Arc::new(Self::new(context.clone())?) as HandlerRef))
    }
}

// ============================================================================
// ProtocolRoutingHandler - Public API
// ============================================================================

impl ProtocolRoutingHandler {
    /// Returns the transport settings in fallback order.
    #[inline]
    #[must_use]
    pub fn routes(&self) -> &[TransportSettings] {
        &self.routes
    }

    /// Returns the composite error policy in use.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Returns the settings of the currently bound transport.
    #[must_use]
    pub fn active_settings(&self) -> Option<&TransportSettings> {
        let index = self.bound.read().as_ref().map(|binding| binding.index)?;
        self.routes.get(index)
    }

    /// Returns the type of the currently bound transport.
    #[must_use]
    pub fn active_transport(&self) -> Option<TransportType> {
        self.active_settings().map(|settings| settings.transport_type)
    }
}

// ============================================================================
// ProtocolRoutingHandler - Fallback
// ============================================================================

impl ProtocolRoutingHandler {
    /// Builds and opens the underlying handler for one route.
    ///
    /// On open failure the handler is closed before the error is returned.
    async fn attempt(
        &self,
        factory: &ContinuationFactory,
        settings: &TransportSettings,
        explicit: bool,
    ) -> Result<HandlerRef> {
        let context = self.core.context().with(settings.clone());
        let handler = factory(&context)?;

        match handler.open(explicit).await {
            Ok(()) => Ok(handler),
            Err(e) => {
                if let Err(close_error) = handler.close().await {
                    debug!(
                        transport = %settings.transport_type,
                        error = %close_error,
                        "Ignoring close failure of failed attempt"
                    );
                }
                Err(e)
            }
        }
    }

    /// Makes `handler` the target of all later operations.
    fn bind(&self, index: usize, handler: HandlerRef) {
        *self.bound.write() = Some(Binding { index, handler });
    }

    /// Closes and releases the handler bound by an earlier open.
    ///
    /// The close is best effort; its error is only logged.
    async fn unbind(&self) {
        let previous = self.bound.write().take();
        let Some(previous) = previous else {
            return;
        };

        let transport = self.routes.get(previous.index).map(|s| s.transport_type);
        if let Err(e) = previous.handler.close().await {
            debug!(?transport, error = %e, "Ignoring close failure of previous transport");
        }
        previous.handler.dispose();
        debug!(?transport, "Previous transport released");
    }
}

// ============================================================================
// DelegatingHandler
// ============================================================================

#[async_trait]
impl DelegatingHandler for ProtocolRoutingHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    async fn inner_handler(&self) -> Result<Option<HandlerRef>> {
        self.core.ensure_live()?;
        Ok(self
            .bound
            .read()
            .as_ref()
            .map(|binding| Arc::clone(&binding.handler)))
    }

    async fn open(&self, explicit: bool) -> Result<()> {
        self.core.ensure_live()?;
        let _guard = self.open_lock.lock().await;

        let Some(factory) = self.core.continuation() else {
            debug!("No continuation, nothing to route");
            return Ok(());
        };

        self.unbind().await;

        let attempts = self.routes.len();
        let mut last_error = None;

        for (index, settings) in self.routes.iter().enumerate() {
            let transport = settings.transport_type;
            debug!(index, %transport, explicit, "Opening transport");

            match self.attempt(&factory, settings, explicit).await {
                Ok(handler) => {
                    self.bind(index, handler);
                    self.core.mark_open();
                    info!(index, %transport, "Transport opened");
                    return Ok(());
                }
                Err(e) if e.is_retryable_with(self.policy) => {
                    warn!(index, %transport, error = %e, "Transport failed, trying next");
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!(index, %transport, error = %e, "Transport failed with fatal error");
                    return Err(e);
                }
            }
        }

        let last_error = last_error
            .unwrap_or_else(|| Error::communication("no transport configuration attempted"));
        warn!(attempts, "All transport configurations failed");
        Err(Error::fallback_exhausted(attempts, last_error))
    }

    fn dispose(&self) {
        if !self.core.dispose() {
            return;
        }

        let bound = self.bound.write().take();
        if let Some(binding) = bound {
            binding.handler.dispose();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
