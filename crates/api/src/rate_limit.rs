// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory admission windows
//!
//! One fixed window per (client, route) pair. A window opens on the first
//! request, counts every request until it expires and is replaced by a fresh
//! window on the next request after expiry. The store holds at most
//! `max_entries` windows; expired windows are swept opportunistically, by a
//! background task and, as a last resort, oldest first.

use std::{
    fmt,
    net::IpAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Identity of the caller a window is tracked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientIdentity(IpAddr);

impl ClientIdentity {
    /// Identify a client by its IP address
    pub const fn new(ip: IpAddr) -> Self {
        Self(ip)
    }

    /// The client's IP address
    pub const fn ip(&self) -> IpAddr {
        self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// HTTP method plus matched path template, e.g. `POST /v2/slp/validateTxid`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteId(Arc<str>);

impl RouteId {
    /// Build a route id from a method and a path template
    pub fn new(method: &str, path_template: &str) -> Self {
        Self(Arc::from(format!("{method} {path_template}")))
    }

    /// The route id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of one admission window
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    /// Who is calling
    pub client: ClientIdentity,
    /// What they are calling
    pub route: RouteId,
}

/// Request count within the current window
#[derive(Debug, Clone, Copy)]
pub struct RateLimitWindow {
    /// Requests seen in this window, saturating at ceiling + 1
    pub count: u32,
    /// When the window opened
    pub window_start: Instant,
}

impl RateLimitWindow {
    fn opened_at(now: Instant) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed
    Allowed,
    /// The request exceeded its ceiling
    Rejected {
        /// Time until the current window expires
        retry_after: Duration,
    },
}

impl Admission {
    /// Returns whether the request may proceed
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Concurrent store of admission windows
#[derive(Debug, Clone)]
pub struct RateLimitStore {
    windows: Arc<DashMap<RateLimitKey, RateLimitWindow>>,
    window: Duration,
    max_entries: usize,
}

impl RateLimitStore {
    /// Create an empty store
    pub fn new(window: Duration, max_entries: usize) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            window,
            max_entries: max_entries.max(1),
        }
    }

    /// Window length
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of tracked windows
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns whether no windows are tracked
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Count a request against `key` and decide whether it is admitted
    pub fn admit(&self, key: RateLimitKey, ceiling: u32) -> Admission {
        self.admit_at(key, ceiling, Instant::now())
    }

    /// Same as [`Self::admit`] with an explicit clock reading
    pub fn admit_at(&self, key: RateLimitKey, ceiling: u32, now: Instant) -> Admission {
        if self.windows.len() >= self.max_entries && !self.windows.contains_key(&key) {
            self.cleanup_expired_entries(now);
        }

        let window = self.window;
        // The entry guard holds the shard lock, so the read-increment-compare
        // below is atomic per key.
        let current = *self
            .windows
            .entry(key)
            .and_modify(|current| {
                if current.is_expired(now, window) {
                    *current = RateLimitWindow::opened_at(now);
                } else {
                    current.count = current.count.saturating_add(1).min(ceiling.saturating_add(1));
                }
            })
            .or_insert_with(|| RateLimitWindow::opened_at(now));

        if current.count <= ceiling {
            Admission::Allowed
        } else {
            let elapsed = now.saturating_duration_since(current.window_start);
            Admission::Rejected {
                retry_after: window.saturating_sub(elapsed),
            }
        }
    }

    /// Drop every expired window, returning how many were removed
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let entries_before = self.windows.len();
        let window = self.window;
        self.windows
            .retain(|_, current| !current.is_expired(now, window));
        entries_before.saturating_sub(self.windows.len())
    }

    /// Make room for a new window
    fn cleanup_expired_entries(&self, now: Instant) {
        let cleaned_up = self.sweep_expired(now);
        if cleaned_up > 0 {
            debug!(cleaned_up, "cleaned up expired rate limiter entries");
        }

        let entries_after = self.windows.len();
        if entries_after < self.max_entries {
            return;
        }

        warn!(
            entries = entries_after,
            "rate limiter still full after cleanup, removing oldest"
        );

        let mut oldest_entries: Vec<_> = self
            .windows
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().window_start))
            .collect();
        oldest_entries.sort_by_key(|(_, window_start)| *window_start);

        let entries_to_remove = entries_after - self.max_entries / 2;
        for (key, _) in oldest_entries.into_iter().take(entries_to_remove) {
            self.windows.remove(&key);
        }
    }

    /// Sweep expired windows every window length until `cancellation_token` fires
    pub fn spawn_sweeper(&self, cancellation_token: CancellationToken) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(store.window);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                tokio::select! {
                    () = cancellation_token.cancelled() => {
                        info!("rate limiter sweeper stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed = store.sweep_expired(Instant::now());
                        if removed > 0 {
                            debug!(removed, remaining = store.len(), "swept expired rate limit windows");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ip: &str, route: &str) -> RateLimitKey {
        RateLimitKey {
            client: ClientIdentity::new(ip.parse().unwrap()),
            route: RouteId::new("GET", route),
        }
    }

    #[test]
    fn admits_up_to_ceiling_then_rejects() {
        let store = RateLimitStore::new(Duration::from_secs(60), 100);
        let now = Instant::now();

        for _ in 0..3 {
            assert_eq!(store.admit_at(key("10.0.0.1", "/a"), 3, now), Admission::Allowed);
        }
        let admission = store.admit_at(key("10.0.0.1", "/a"), 3, now);
        assert_eq!(
            admission,
            Admission::Rejected {
                retry_after: Duration::from_secs(60)
            }
        );
    }

    #[test]
    fn count_saturates_above_ceiling() {
        let store = RateLimitStore::new(Duration::from_secs(60), 100);
        let now = Instant::now();

        for _ in 0..50 {
            store.admit_at(key("10.0.0.1", "/a"), 2, now);
        }
        let current = *store.windows.get(&key("10.0.0.1", "/a")).unwrap();
        assert_eq!(current.count, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_admissions_respect_ceiling() {
        let store = RateLimitStore::new(Duration::from_secs(60), 100);
        let now = Instant::now();

        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.admit_at(key("10.0.0.1", "/a"), 60, now) })
            })
            .collect();

        let mut allowed = 0;
        for task in tasks {
            if task.await.unwrap().is_allowed() {
                allowed += 1;
            }
        }

        assert_eq!(allowed, 60);
        let current = *store.windows.get(&key("10.0.0.1", "/a")).unwrap();
        assert_eq!(current.count, 61);
    }

    #[test]
    fn window_resets_after_expiry() {
        let store = RateLimitStore::new(Duration::from_secs(60), 100);
        let start = Instant::now();

        assert!(store.admit_at(key("10.0.0.1", "/a"), 1, start).is_allowed());
        assert!(!store.admit_at(key("10.0.0.1", "/a"), 1, start).is_allowed());

        // Exactly at the boundary the window is still open.
        let boundary = start + Duration::from_secs(60);
        assert!(!store.admit_at(key("10.0.0.1", "/a"), 1, boundary).is_allowed());

        let later = start + Duration::from_secs(61);
        assert!(store.admit_at(key("10.0.0.1", "/a"), 1, later).is_allowed());
    }

    #[test]
    fn clients_and_routes_are_independent() {
        let store = RateLimitStore::new(Duration::from_secs(60), 100);
        let now = Instant::now();

        assert!(store.admit_at(key("10.0.0.1", "/a"), 1, now).is_allowed());
        assert!(store.admit_at(key("10.0.0.2", "/a"), 1, now).is_allowed());
        assert!(store.admit_at(key("10.0.0.1", "/b"), 1, now).is_allowed());
        assert!(!store.admit_at(key("10.0.0.1", "/a"), 1, now).is_allowed());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn zero_ceiling_rejects_everything() {
        let store = RateLimitStore::new(Duration::from_secs(60), 100);
        assert!(!store.admit(key("10.0.0.1", "/a"), 0).is_allowed());
    }

    #[test]
    fn sweep_drops_only_expired_windows() {
        let store = RateLimitStore::new(Duration::from_secs(10), 100);
        let start = Instant::now();

        store.admit_at(key("10.0.0.1", "/a"), 5, start);
        store.admit_at(key("10.0.0.2", "/a"), 5, start + Duration::from_secs(8));

        let removed = store.sweep_expired(start + Duration::from_secs(15));
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_stays_bounded() {
        let store = RateLimitStore::new(Duration::from_secs(60), 4);
        let start = Instant::now();

        for i in 0..10u64 {
            let ip = format!("10.0.0.{i}");
            store.admit_at(key(&ip, "/a"), 5, start + Duration::from_millis(i));
        }

        assert!(store.len() <= 4);
        // The newest client survived eviction.
        assert!(store.windows.contains_key(&key("10.0.0.9", "/a")));
    }

    #[tokio::test]
    async fn sweeper_stops_on_cancellation() {
        let store = RateLimitStore::new(Duration::from_millis(10), 100);
        let token = CancellationToken::new();
        let handle = store.spawn_sweeper(token.clone());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
