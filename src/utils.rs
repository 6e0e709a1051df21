use tokio::time::{sleep, Duration};
use tracing::info;

/// Fibonacci backoff: `initial, initial, 2*initial, 3*initial, ...`, giving
/// up after `max_retries` waits.
#[derive(Debug, Clone)]
pub struct Backoff {
    fib: (Duration, Duration),
    retries: usize,
    max_retries: usize,
}

impl Backoff {
    pub fn new(initial_delay: Duration, max_retries: usize) -> Self {
        Self {
            fib: (initial_delay, initial_delay),
            retries: 0,
            max_retries,
        }
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Sleeps for the next delay. Returns `false` without sleeping once the
    /// retry budget is spent.
    pub async fn wait(&mut self, reason: &str) -> bool {
        if self.retries >= self.max_retries {
            return false;
        }
        info!(
            "{}. Retrying in {:?} (attempt {}/{})",
            reason,
            self.fib.0,
            self.retries + 1,
            self.max_retries
        );
        sleep(self.fib.0).await;
        self.retries += 1;
        self.fib = (self.fib.1, self.fib.0 + self.fib.1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn backoff_stops_after_budget() {
        let mut backoff = Backoff::new(Duration::from_millis(1), 3);
        assert!(backoff.wait("first").await);
        assert!(backoff.wait("second").await);
        assert!(backoff.wait("third").await);
        assert!(!backoff.wait("fourth").await);
        assert_eq!(backoff.retries(), 3);
    }

    #[tokio::test]
    async fn delays_follow_fibonacci() {
        let mut backoff = Backoff::new(Duration::from_millis(1), 4);
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(backoff.fib.0);
            backoff.wait("retry").await;
        }
        assert_eq!(
            seen,
            vec![1, 1, 2, 3]
                .into_iter()
                .map(Duration::from_millis)
                .collect::<Vec<_>>()
        );
    }
}
