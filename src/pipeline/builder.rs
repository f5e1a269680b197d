//! Builder that links continuation factories into a handler chain.
//!
//! # Example
//!
//! ```ignore
//! use devicelink::pipeline::{DefaultDelegatingHandler, PipelineBuilder, PipelineContext};
//! use devicelink::transport::{ProtocolRoutingHandler, TransportHandler};
//!
//! let head = PipelineBuilder::new()
//!     .with(DefaultDelegatingHandler::factory())
//!     .with(ProtocolRoutingHandler::factory())
//!     .with(TransportHandler::factory(connector))
//!     .build(&context)?;
//!
//! head.open(true).await?;
//! ```
//!
//! # Linking
//!
//! The factories are kept as an ordered array. The link for index `i` runs
//! `factories[i]` and hands the produced node the link for `i + 1` as its
//! continuation, without running it. Only the head node exists after
//! [`build`](PipelineBuilder::build); every later node is created the first
//! time its predecessor needs it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::context::PipelineContext;
use super::handler::{ContinuationFactory, HandlerRef};

// ============================================================================
// PipelineBuilder
// ============================================================================

/// Ordered list of continuation factories.
///
/// Insertion order is chain order: the first factory produces the head.
#[derive(Clone, Default)]
pub struct PipelineBuilder {
    /// Factories in chain order.
    factories: Vec<ContinuationFactory>,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("len", &self.factories.len())
            .finish()
    }
}

// ============================================================================
// PipelineBuilder Implementation
// ============================================================================

impl PipelineBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a factory to the end of the chain.
    #[inline]
    #[must_use]
    pub fn with(mut self, factory: ContinuationFactory) -> Self {
        self.factories.push(factory);
        self
    }

    /// Returns the number of factories.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if no factory has been added.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Builds the chain and returns its head.
    ///
    /// Each call produces fresh handler instances.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no factory has been added
    /// - any error returned by the first factory
    pub fn build(&self, context: &PipelineContext) -> Result<HandlerRef> {
        if self.factories.is_empty() {
            return Err(Error::config(
                "pipeline must contain at least one handler factory",
            ));
        }

        let chain: Arc<[ContinuationFactory]> = self.factories.iter().cloned().collect();
        let head = link(chain, 0)(context)?;

        debug!(handlers = self.factories.len(), "Pipeline built");
        Ok(head)
    }
}

// ============================================================================
// Linking
// ============================================================================

/// Returns a factory for node `index` that wires node `index + 1` behind it.
fn link(chain: Arc<[ContinuationFactory]>, index: usize) -> ContinuationFactory {
    Arc::new(move |context| {
        let factory = &chain[index];
        let handler = factory(context)?;

        let next = index + 1;
        if next < chain.len() {
            handler.set_continuation(link(Arc::clone(&chain), next));
        }

        trace!(index, "Pipeline handler constructed");
        Ok(handler)
    })
}

// ============================================================================
// Tests
// ============================================================================
