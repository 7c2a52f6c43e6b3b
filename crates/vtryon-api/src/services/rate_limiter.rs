//! Sliding-window limiter for live try-on frames.
//!
//! Webcam clients send frames continuously, so the per-IP token bucket used
//! for the rest of the API is too coarse. This limiter admits at most
//! `max_requests` per client inside any trailing `window`. Rejected calls are
//! not recorded, so a client that backs off regains capacity as soon as old
//! timestamps leave the window.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// Per-client sliding window of accepted request times.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit or reject a request from `client_id` now.
    pub fn allow(&self, client_id: &str) -> bool {
        self.allow_at(client_id, Instant::now())
    }

    /// Admit or reject a request from `client_id` at an explicit time.
    pub fn allow_at(&self, client_id: &str, now: Instant) -> bool {
        let mut clients = self.lock();
        let timestamps = clients.entry(client_id.to_string()).or_default();

        while let Some(&oldest) = timestamps.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.max_requests {
            debug!(client = %client_id, in_window = timestamps.len(), "Live request rejected");
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Drop clients idle for longer than `retention`. Returns how many were removed.
    pub fn prune_stale(&self, retention: Duration) -> usize {
        self.prune_stale_at(retention, Instant::now())
    }

    pub fn prune_stale_at(&self, retention: Duration, now: Instant) -> usize {
        let mut clients = self.lock();
        let before = clients.len();
        let window = self.window;

        clients.retain(|_, timestamps| {
            let newest = match timestamps.back() {
                Some(&t) => t,
                None => return false,
            };
            if now.saturating_duration_since(newest) > retention {
                return false;
            }
            timestamps.retain(|&t| now.saturating_duration_since(t) < window);
            true
        });

        before - clients.len()
    }

    /// Number of tracked clients.
    pub fn client_count(&self) -> usize {
        self.lock().len()
    }

    /// Forget every client. Returns how many were tracked.
    pub fn clear(&self) -> usize {
        let mut clients = self.lock();
        let count = clients.len();
        clients.clear();
        count
    }
}
