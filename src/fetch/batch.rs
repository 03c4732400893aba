//! Bounded-concurrency batch mapping.
//!
//! A fixed pool of workers pulls indices from a shared cursor, so at most
//! `concurrency` mapper futures are in flight at once. Output order always
//! matches input order.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;

/// Map `items` through `mapper` with at most `concurrency` calls in flight.
///
/// `results[i]` is `mapper(&items[i], i)` regardless of completion order.
/// The mapper owns its failure policy: return an item-level error value
/// rather than panicking, or the whole batch is lost.
pub async fn map_limit<'a, T, R, F, Fut>(items: &'a [T], concurrency: usize, mapper: F) -> Vec<R>
where
    F: Fn(&'a T, usize) -> Fut,
    Fut: Future<Output = R>,
{
    if items.is_empty() {
        return Vec::new();
    }

    let cursor = AtomicUsize::new(0);
    let cursor = &cursor;
    let mapper = &mapper;
    let workers = concurrency.max(1).min(items.len());

    let pool = (0..workers).map(|_| async move {
        let mut done = Vec::new();
        loop {
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            if index >= items.len() {
                break;
            }
            done.push((index, mapper(&items[index], index).await));
        }
        done
    });

    let mut finished: Vec<(usize, R)> = join_all(pool).await.into_iter().flatten().collect();
    finished.sort_by_key(|(index, _)| *index);
    finished.into_iter().map(|(_, result)| result).collect()
}
