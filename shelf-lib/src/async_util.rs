//! Driving a task while draining its event channel.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// How long to keep draining once the task is done. Bounds the wait if a
/// sender outlives the task.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `task` to completion, handing every event received on `events` to
/// `on_event` in arrival order.
///
/// Events still queued when the task finishes are delivered before the
/// task's result is returned. `on_event` is only ever called from this
/// future, so it is the single serialized consumer of the channel.
pub async fn run_with_events<F, E, R>(
    task: F,
    mut events: mpsc::UnboundedReceiver<E>,
    mut on_event: impl FnMut(E),
) -> R
where
    F: Future<Output = R>,
{
    tokio::pin!(task);
    let mut received: u64 = 0;

    let result = loop {
        tokio::select! {
            r = &mut task => break Some(r),
            event = events.recv() => match event {
                Some(e) => {
                    received += 1;
                    on_event(e);
                }
                None => break None,
            }
        }
    };

    let result = match result {
        Some(r) => r,
        // Every sender is gone; nothing more can arrive.
        None => {
            log::debug!("event channel closed after {} events, awaiting task", received);
            return task.await;
        }
    };

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(e)) => {
                received += 1;
                on_event(e);
            }
            Ok(None) => break,
            Err(_) => {
                log::warn!(
                    "Stopped draining events after {}s; a sender was never dropped",
                    DRAIN_TIMEOUT.as_secs()
                );
                break;
            }
        }
    }
    log::debug!("delivered {} events", received);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_sent_before_completion_are_all_delivered() {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = async move {
            for i in 0..5 {
                tx.send(i).unwrap();
            }
            "done"
        };

        let mut seen = Vec::new();
        let result = run_with_events(task, rx, |e| seen.push(e)).await;
        assert_eq!(result, "done");
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn closed_channel_still_returns_task_result() {
        let (tx, rx) = mpsc::unbounded_channel::<u32>();
        drop(tx);
        let task = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            7
        };
        let result = run_with_events(task, rx, |_| {}).await;
        assert_eq!(result, 7);
    }
}
