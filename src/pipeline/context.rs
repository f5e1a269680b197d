//! Typed key/value context passed to continuation factories.
//!
//! Values are keyed either by their type alone or by an explicit name plus
//! their type. A lookup never returns a value of a different type than the
//! one requested: a name stored as `u32` is simply absent when read as
//! `String`.
//!
//! # Example
//!
//! ```ignore
//! use devicelink::pipeline::PipelineContext;
//! use devicelink::transport::TransportSettings;
//!
//! let mut context = PipelineContext::new();
//! context.set(TransportSettings::amqp_fallback_chain());
//! context.set_named("product-info", String::from("sensor/1.2"));
//!
//! let routes: Option<Vec<TransportSettings>> = context.get();
//! let product = context.get_named_or("product-info", String::new());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Lookup key: a type identity, or an explicit name scoped by type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ContextKey {
    Type(TypeId),
    Named(String, TypeId),
}

impl ContextKey {
    fn of<T: 'static>() -> Self {
        Self::Type(TypeId::of::<T>())
    }

    fn named<T: 'static>(key: impl Into<String>) -> Self {
        Self::Named(key.into(), TypeId::of::<T>())
    }
}

/// Shared, type-erased context value.
type ContextValue = Arc<dyn Any + Send + Sync>;

// ============================================================================
// PipelineContext
// ============================================================================

/// Typed configuration bag supplied to every continuation factory.
///
/// Cloning is cheap: values are shared, and a clone can be extended with
/// [`with`](Self::with) without affecting the original.
#[derive(Clone, Default)]
pub struct PipelineContext {
    values: FxHashMap<ContextKey, ContextValue>,
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("len", &self.values.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PipelineContext - Writes
// ============================================================================

impl PipelineContext {
    /// Creates an empty context.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` keyed by its type, replacing any previous value.
    pub fn set<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.values.insert(ContextKey::of::<T>(), Arc::new(value));
    }

    /// Stores `value` under `key`, replacing any previous value of the same
    /// type under that name.
    pub fn set_named<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.values.insert(ContextKey::named::<T>(key), Arc::new(value));
    }

    /// Returns a copy of this context with `value` stored by its type.
    #[must_use]
    pub fn with<T>(&self, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let mut context = self.clone();
        context.set(value);
        context
    }
}

// ============================================================================
// PipelineContext - Reads
// ============================================================================

impl PipelineContext {
    /// Returns the value stored for type `T`.
    #[must_use]
    pub fn get<T>(&self) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.lookup(&ContextKey::of::<T>())
    }

    /// Returns the value stored for type `T`, or `default`.
    #[must_use]
    pub fn get_or<T>(&self, default: T) -> T
    where
        T: Clone + 'static,
    {
        self.get().unwrap_or(default)
    }

    /// Returns the value of type `T` stored under `key`.
    #[must_use]
    pub fn get_named<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.lookup(&ContextKey::named::<T>(key))
    }

    /// Returns the value of type `T` stored under `key`, or `default`.
    #[must_use]
    pub fn get_named_or<T>(&self, key: &str, default: T) -> T
    where
        T: Clone + 'static,
    {
        self.get_named(key).unwrap_or(default)
    }

    /// Returns the value stored for type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no value of type `T` is present.
    pub fn require<T>(&self) -> Result<T>
    where
        T: Clone + 'static,
    {
        self.get().ok_or_else(|| {
            Error::config(format!(
                "pipeline context has no value of type {}",
                type_name::<T>()
            ))
        })
    }

    /// Returns `true` if a value of type `T` is present.
    #[inline]
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.values.contains_key(&ContextKey::of::<T>())
    }

    /// Returns the number of stored values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the context holds no values.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn lookup<T>(&self, key: &ContextKey) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.values
            .get(key)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }
}

// ============================================================================
// Tests
// ============================================================================
