//! Order-preserving map over a slice, optionally on the rayon pool.

/// Maps `f` over `items`, keeping input order in the output.
///
/// Runs on the rayon thread pool when `parallel` is set and the `parallel`
/// feature is enabled; sequentially otherwise.
pub(crate) fn map_ordered<T, R, F>(items: &[T], parallel: bool, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    #[cfg(feature = "parallel")]
    if parallel {
        use rayon::prelude::*;
        return items.par_iter().map(f).collect();
    }

    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    items.iter().map(f).collect()
}
