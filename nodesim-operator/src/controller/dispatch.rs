use std::future::Future;

use futures_util::{StreamExt, stream};

/// Run every unit of work with at most `limit` in flight, collecting each
/// unit's result. Completion order is not preserved; a failing unit only
/// affects its own slot in the output and never cancels siblings.
pub async fn run_bounded<T, R, F, Fut>(
    limit: usize,
    items: Vec<T>,
    op: F,
) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    stream::iter(items.into_iter().map(op))
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}
