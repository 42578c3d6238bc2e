//! Configuration constants and tuning knobs for lockpool.

use std::time::Duration;

/// Size of a page in bytes (4KB).
///
/// Every page the buffer pool caches and every page a store persists has
/// exactly this many bytes.
pub const PAGE_SIZE: usize = 4096;

/// Default number of resident pages in a buffer pool.
pub const DEFAULT_PAGES: usize = 50;

/// Default number of times a lock request is retried before the requester
/// is presumed deadlocked.
pub const DEFAULT_LOCK_ATTEMPTS: u32 = 10;

/// Default wait between two lock attempts.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(10);

/// Bounded retry policy for lock acquisition.
///
/// A request that is still denied after `max_attempts` waits of at most
/// `retry_interval` each fails with [`Error::Deadlock`](crate::Error::Deadlock).
/// The worst-case wait of a single request is therefore
/// `max_attempts * retry_interval`.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use lockpool::RetryPolicy;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(5));
/// assert_eq!(policy.max_wait(), Duration::from_millis(15));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of waits before giving up.
    pub max_attempts: u32,
    /// Upper bound on a single wait.
    pub retry_interval: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_attempts: u32, retry_interval: Duration) -> Self {
        Self {
            max_attempts,
            retry_interval,
        }
    }

    /// A policy that never waits: denied requests fail immediately.
    pub fn no_wait() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Longest time a single request may block, saturating at
    /// `Duration::MAX`.
    pub fn max_wait(&self) -> Duration {
        self.retry_interval
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_ATTEMPTS, DEFAULT_LOCK_WAIT)
    }
}

/// Construction parameters of a [`BufferPool`](crate::BufferPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Maximum number of resident pages.
    pub num_pages: usize,
    /// Lock acquisition policy used by the pool's lock table.
    pub retry: RetryPolicy,
}

impl BufferPoolConfig {
    /// Configuration with `num_pages` capacity and the default retry policy.
    pub fn new(num_pages: usize) -> Self {
        Self {
            num_pages,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the lock retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the capacity.
    pub fn with_num_pages(mut self, num_pages: usize) -> Self {
        self.num_pages = num_pages;
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.retry_interval, Duration::from_millis(10));
        assert_eq!(policy.max_wait(), Duration::from_millis(100));
    }

    #[test]
    fn test_no_wait_policy() {
        assert_eq!(RetryPolicy::no_wait().max_wait(), Duration::ZERO);
    }

    #[test]
    fn test_max_wait_saturates() {
        let policy = RetryPolicy::new(u32::MAX, Duration::MAX);
        assert_eq!(policy.max_wait(), Duration::MAX);

        let policy = RetryPolicy::new(3, Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.max_wait(), Duration::MAX);
    }

    #[test]
    fn test_config_builders() {
        let config = BufferPoolConfig::default()
            .with_num_pages(3)
            .with_retry(RetryPolicy::no_wait());

        assert_eq!(config.num_pages, 3);
        assert_eq!(config.retry, RetryPolicy::no_wait());
        assert_eq!(BufferPoolConfig::default().num_pages, DEFAULT_PAGES);
    }
}
