//! Interceptor trait and chain composition.

use std::fmt;
use std::sync::Arc;

use super::SharedTransport;

/// A decorator that wraps an inner transport and returns an outer one.
///
/// Interceptors are registered once at client construction. Each one must
/// pass through requests and responses it does not care about, be safe to
/// call concurrently, and restore a readable body whenever it reads one.
///
/// Any `Fn(SharedTransport) -> SharedTransport` closure is an interceptor.
pub trait Interceptor: Send + Sync {
    /// Wraps `next`, returning the transport that runs before it.
    fn wrap(&self, next: SharedTransport) -> SharedTransport;
}

impl<F> Interceptor for F
where
    F: Fn(SharedTransport) -> SharedTransport + Send + Sync,
{
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        self(next)
    }
}

/// An ordered list of interceptors.
///
/// Registration order is outer-to-inner execution order: with `[A, B, C]`
/// a request runs `A → B → C → base`, so the last-registered interceptor
/// sits closest to the wire.
#[derive(Clone, Default)]
pub struct Chain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor; it runs inside every previously pushed one.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Appends an interceptor, builder style.
    #[must_use]
    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.push(Arc::new(interceptor));
        self
    }

    /// Appends every interceptor of `other`, keeping its order.
    pub fn extend(&mut self, other: Self) {
        self.interceptors.extend(other.interceptors);
    }

    /// Returns the number of registered interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns true if no interceptor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Wraps `base` with every interceptor, innermost first.
    #[must_use]
    pub fn build(&self, base: SharedTransport) -> SharedTransport {
        self.interceptors
            .iter()
            .rev()
            .fold(base, |next, interceptor| interceptor.wrap(next))
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("len", &self.interceptors.len())
            .finish()
    }
}
