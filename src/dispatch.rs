//! Bounded fan-out over independent work items.

use std::future::Future;
use std::sync::Arc;

use log::warn;
use tokio::sync::Semaphore;

/// Runs `handler` once per item, with at most `limit` invocations in flight,
/// and waits for all of them to finish before returning.
///
/// Completion order is unconstrained; outputs come back in submission order
/// via the join handles. A worker that aborts is logged and yields no
/// output — the caller is responsible for accounting for missing items.
pub async fn run<T, O, F, Fut>(items: Vec<T>, limit: usize, handler: F) -> Vec<O>
where
    T: Send + 'static,
    O: Send + 'static,
    F: Fn(T) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = O> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        let semaphore = Arc::clone(&semaphore);
        let handler = handler.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .expect("semaphore should never be closed");
            handler(item).await
        }));
    }

    let mut outputs = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(output) => outputs.push(output),
            Err(e) => warn!("Worker task aborted: {}", e),
        }
    }

    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn invokes_handler_exactly_once_per_item() {
        let invocations = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&invocations);
        let outputs = run(
            (0..20u64).collect::<Vec<_>>(),
            4,
            move |item| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    item * 2
                }
            },
        )
        .await;

        assert_eq!(invocations.load(Ordering::SeqCst), 20);
        // Submission order is preserved in the collected outputs
        assert_eq!(outputs, (0..20u64).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_never_exceeds_limit() {
        const LIMIT: usize = 3;

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let current = Arc::clone(&in_flight);
        let high_water = Arc::clone(&peak);
        run(
            (0..30u64).collect::<Vec<_>>(),
            LIMIT,
            move |_item| {
                let current = Arc::clone(&current);
                let high_water = Arc::clone(&high_water);
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    high_water.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                }
            },
        )
        .await;

        assert!(peak.load(Ordering::SeqCst) <= LIMIT);
        assert_eq!(peak.load(Ordering::SeqCst), LIMIT);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_produces_empty_output() {
        let outputs: Vec<u64> = run(Vec::new(), 5, |item: u64| async move { item }).await;
        assert!(outputs.is_empty());
    }
}
