use std::{cell::Cell, fmt};

use crate::exception::{ExcType, Exception};

/// Recommended maximum dispatch depth if not otherwise specified.
///
/// Each nested proxy operation (an override calling back into its own proxy, a proxy
/// wrapping a proxy, a forwarded `repr` of a container holding proxies) adds one level.
pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 256;

/// Error returned when a dispatch limit is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// Maximum nested dispatch depth exceeded.
    Depth { limit: usize, depth: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Depth { limit, depth } => {
                write!(f, "maximum proxy dispatch depth exceeded: {depth} > {limit}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<ResourceError> for Exception {
    /// `Depth` maps to `RecursionError`, so callers can catch it like any other
    /// runaway recursion.
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Depth { .. } => ExcType::RecursionError.with_message(err),
        }
    }
}

thread_local! {
    static DISPATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Current nested dispatch depth on this thread.
#[must_use]
pub fn dispatch_depth() -> usize {
    DISPATCH_DEPTH.with(Cell::get)
}

/// Marks one active dispatch on the current thread; the depth is restored on drop,
/// including when the dispatch unwinds through an error.
#[derive(Debug)]
pub(crate) struct DepthGuard {
    depth: usize,
}

impl DepthGuard {
    /// Enters one more dispatch level, failing when `limit` would be exceeded.
    pub fn enter(limit: Option<usize>) -> Result<Self, ResourceError> {
        let current = dispatch_depth();
        if let Some(limit) = limit
            && current >= limit
        {
            return Err(ResourceError::Depth {
                limit,
                depth: current + 1,
            });
        }
        let depth = current + 1;
        DISPATCH_DEPTH.with(|d| d.set(depth));
        Ok(Self { depth })
    }

    /// Depth of this dispatch, starting at 1 for the outermost.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DISPATCH_DEPTH.with(|d| d.set(self.depth - 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_depth() {
        assert_eq!(dispatch_depth(), 0);
        {
            let outer = DepthGuard::enter(Some(2)).unwrap();
            assert_eq!(outer.depth(), 1);
            let inner = DepthGuard::enter(Some(2)).unwrap();
            assert_eq!(inner.depth(), 2);
            let err = DepthGuard::enter(Some(2)).unwrap_err();
            assert_eq!(err, ResourceError::Depth { limit: 2, depth: 3 });
        }
        assert_eq!(dispatch_depth(), 0);
    }

    #[test]
    fn depth_error_is_recursion_error() {
        let exc = Exception::from(ResourceError::Depth { limit: 1, depth: 2 });
        assert_eq!(exc.exc_type(), ExcType::RecursionError);
    }
}
