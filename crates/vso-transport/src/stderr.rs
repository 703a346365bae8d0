use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Mutex;

/// Bounded buffer for a child's stderr. Lines stream in continuously; on
/// overflow the oldest lines are discarded and a counter tracks how many
/// were dropped.
#[derive(Clone)]
pub struct StderrSink {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
    dropped: Arc<AtomicU64>,
}

impl StderrSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn a background task that reads lines from `stderr`, forwards each
    /// to `tracing::debug!`, and retains the most recent `capacity` lines.
    pub fn spawn_drain<R>(&self, stderr: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sink = self.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "child_stderr", "{line}");
                sink.push(line).await;
            }
        });
    }

    async fn push(&self, line: String) {
        let mut guard = self.lines.lock().await;
        if guard.len() >= self.capacity {
            guard.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        guard.push_back(line);
    }

    pub async fn recent(&self) -> Vec<String> {
        self.lines.lock().await.iter().cloned().collect()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overflow_discards_oldest_and_counts() {
        let sink = StderrSink::new(2);
        sink.push("a".into()).await;
        sink.push("b".into()).await;
        sink.push("c".into()).await;

        assert_eq!(sink.recent().await, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(sink.dropped_count(), 1);
    }

    #[tokio::test]
    async fn spawn_drain_captures_lines() {
        let (mut w, r) = tokio::io::duplex(4096);
        let sink = StderrSink::new(10);
        sink.spawn_drain(r);

        tokio::io::AsyncWriteExt::write_all(&mut w, b"oops\nfailed again\n")
            .await
            .unwrap();
        drop(w);

        // Give the background task a chance to drain.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let recent = sink.recent().await;
        assert_eq!(recent, vec!["oops".to_string(), "failed again".to_string()]);
    }
}
