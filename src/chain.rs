//! Ordered middleware sequences.

use std::fmt;
use std::sync::Arc;

use crate::handler::BoxedHandler;
use crate::middleware::Middleware;

/// An ordered sequence of middleware.
///
/// Cloning a chain copies the sequence: the copy and the original grow
/// independently. Layers themselves are shared behind `Arc`.
///
/// Applying `[m1, m2, m3]` to a handler `h` yields `m1(m2(m3(h)))`, so `m1`
/// runs first on the way in and last on the way out.
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer. Returns `self` for chaining.
    pub fn then(mut self, mw: impl Middleware) -> Self {
        self.push(mw);
        self
    }

    pub fn push(&mut self, mw: impl Middleware) {
        self.layers.push(Arc::new(mw));
    }

    /// Appends every layer of `other`, in order.
    pub fn extend(&mut self, other: &Chain) {
        self.layers.extend(other.layers.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wraps `base` in every layer, first-registered outermost.
    ///
    /// An empty chain returns `base` itself.
    pub fn apply(&self, base: BoxedHandler) -> BoxedHandler {
        self.layers.iter().rev().fold(base, |inner, mw| mw.wrap(inner))
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("layers", &self.layers.len()).finish()
    }
}
