//! Configuration options for Dson engines.
//!
//! Every reader and writer takes a [`DsonOptions`] by value at construction.
//!
//! ## Examples
//!
//! ```rust
//! use dson::{DsonOptions, WireType};
//!
//! // Tighter nesting limit for untrusted input
//! let options = DsonOptions::new().with_recursion_limit(8);
//! assert_eq!(options.recursion_limit, 8);
//!
//! // Zigzag integers when writing value trees
//! let options = DsonOptions::new().with_default_wire_type(WireType::Sint);
//! ```

use crate::types::WireType;

/// Default maximum container nesting depth.
pub const DEFAULT_RECURSION_LIMIT: usize = 32;

/// Configuration options for Dson readers and writers.
///
/// # Examples
///
/// ```rust
/// use dson::DsonOptions;
///
/// let options = DsonOptions::new()
///     .with_recursion_limit(64)
///     .with_auto_close(true);
/// assert!(options.auto_close);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DsonOptions {
    /// Maximum number of containers open at the same time.
    pub recursion_limit: usize,
    /// Whether `close` flushes and releases the writer's byte sink.
    pub auto_close: bool,
    /// Wire type used for Int32/Int64 when writing [`DsonValue`](crate::DsonValue) trees.
    pub default_wire_type: WireType,
    /// Number of spare contexts kept for reuse after a container closes.
    pub context_pool_size: usize,
}

impl Default for DsonOptions {
    fn default() -> Self {
        DsonOptions {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            auto_close: false,
            default_wire_type: WireType::VarInt,
            context_pool_size: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl DsonOptions {
    /// Creates default options (depth limit 32, VarInt integers, sink not owned).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dson::DsonOptions;
    ///
    /// let options = DsonOptions::new();
    /// assert_eq!(options.recursion_limit, 32);
    /// assert!(!options.auto_close);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum container nesting depth.
    ///
    /// A limit of zero is raised to one so that a single top-level container can
    /// still be read.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dson::DsonOptions;
    ///
    /// assert_eq!(DsonOptions::new().with_recursion_limit(0).recursion_limit, 1);
    /// ```
    #[must_use]
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit.max(1);
        self
    }

    /// Makes `close` flush and drop the writer's sink.
    #[must_use]
    pub fn with_auto_close(mut self, auto_close: bool) -> Self {
        self.auto_close = auto_close;
        self
    }

    /// Sets the wire type used for integers when writing value trees.
    #[must_use]
    pub fn with_default_wire_type(mut self, wire_type: WireType) -> Self {
        self.default_wire_type = wire_type;
        self
    }

    /// Sets how many released contexts are kept for reuse.
    #[must_use]
    pub fn with_context_pool_size(mut self, size: usize) -> Self {
        self.context_pool_size = size;
        self
    }
}
