//! Bounded concurrent iteration.

use crate::errors::PromptflowError;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;

/// Runs `callback` over `items` with at most `max_parallel_count` calls in
/// flight.
///
/// A new call starts only when the earliest running one has finished.
/// Results are returned in item order. A `max_parallel_count` of zero is
/// treated as one.
///
/// # Errors
///
/// Returns the first error produced; calls still running are dropped.
pub async fn for_each_async<T, R, F, Fut>(
    items: impl IntoIterator<Item = T>,
    max_parallel_count: usize,
    mut callback: F,
) -> Result<Vec<R>, PromptflowError>
where
    F: FnMut(T, usize) -> Fut,
    Fut: Future<Output = Result<R, PromptflowError>>,
{
    let max_parallel_count = max_parallel_count.max(1);
    let mut in_flight = FuturesUnordered::new();
    let mut results: Vec<Option<R>> = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        results.push(None);

        if in_flight.len() >= max_parallel_count {
            if let Some((finished, result)) = in_flight.next().await {
                results[finished] = Some(result?);
            }
        }

        let future = callback(item, index);
        in_flight.push(async move { (index, future.await) });
    }

    while let Some((finished, result)) = in_flight.next().await {
        results[finished] = Some(result?);
    }

    results
        .into_iter()
        .enumerate()
        .map(|(index, result)| {
            result.ok_or_else(|| {
                PromptflowError::unexpected(format!("Item {index} finished without a result"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_keep_item_order() {
        let results = for_each_async(vec![30u64, 10, 20], 3, |delay, index| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(index)
        })
        .await
        .unwrap();

        assert_eq!(results, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_never_exceeds_bound() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for_each_async(0..10, 2, |_, _| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_first_error_is_returned() {
        let result: Result<Vec<()>, _> = for_each_async(0..5, 2, |item, _| async move {
            if item == 3 {
                Err(PromptflowError::execution("item 3 failed"))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(result.unwrap_err().to_string(), "item 3 failed");
    }

    #[tokio::test]
    async fn test_zero_bound_runs_sequentially() {
        let results = for_each_async(vec!["a", "b"], 0, |item, _| async move { Ok(item.to_uppercase()) })
            .await
            .unwrap();
        assert_eq!(results, vec!["A", "B"]);
    }
}
