//! Request identifier generation.
//!
//! A request ID looks like `api-7.example.com/Xk2P9qLm0Z-000042`:
//!
//! ```text
//! {hostname}/{10 random base62 chars}-{counter, at least 6 digits}
//! ```
//!
//! The random part is drawn once per [`IdGenerator`] and identifies the
//! process; the counter identifies the request within it.
//!
//! # Why ten characters
//!
//! Two processes collide only if their random parts match. By the birthday
//! bound `P[m, n] ≈ 1 - e^(-m² / 2n)` with `n = 62^10`, a server restarting
//! once per second for ten years (`m = 86400 · 365 · 10 ≈ 3.15e8`) ends up
//! with roughly a 5.75% chance of ever reusing a prefix. A process restarted
//! a handful of times a day for a century stays below one in a hundred
//! million. Shorter prefixes lose that margin quickly; keep it at ten.

use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Host name used when the system one is unavailable or empty.
pub const FALLBACK_HOSTNAME: &str = "localhost";

/// Length of the random component of the prefix.
pub const RANDOM_LEN: usize = 10;

/// Width the counter is zero-padded to. Larger counters are never truncated.
const COUNTER_WIDTH: usize = 6;

/// Issues unique request identifiers.
///
/// Build one at startup and share it (`Arc<IdGenerator>`) with every
/// [`RequestId`](crate::middleware::RequestId) middleware that should draw
/// from the same sequence. `next_id` is lock-free and safe to call from any
/// number of tasks at once.
#[derive(Debug)]
pub struct IdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl IdGenerator {
    /// Creates a generator prefixed with this machine's host name.
    pub fn new() -> Self {
        Self::with_hostname(system_hostname().unwrap_or_default())
    }

    /// Creates a generator with an explicit host name.
    ///
    /// An empty name is replaced by [`FALLBACK_HOSTNAME`].
    pub fn with_hostname(hostname: impl Into<String>) -> Self {
        let mut hostname = hostname.into();
        if hostname.is_empty() {
            hostname = FALLBACK_HOSTNAME.to_owned();
        }

        Self {
            prefix: format!("{hostname}/{}", random_component()),
            counter: AtomicU64::new(0),
        }
    }

    /// The `{hostname}/{random}` part shared by every ID this generator issues.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the next identifier.
    ///
    /// The first call yields `{prefix}-000001`. The counter wraps at
    /// `u64::MAX` instead of overflowing.
    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        format!("{}-{n:0width$}", self.prefix, width = COUNTER_WIDTH)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Draws random bytes until the base64 text minus `+` and `/` is long enough.
///
/// 12 bytes encode to 16 characters, so a retry is rare but possible.
fn random_component() -> String {
    loop {
        let bytes: [u8; 12] = rand::random();
        let encoded: String = STANDARD
            .encode(bytes)
            .chars()
            .filter(|c| *c != '+' && *c != '/')
            .collect();

        if encoded.len() >= RANDOM_LEN {
            return encoded.chars().take(RANDOM_LEN).collect();
        }
    }
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: `buf` is valid for writes of `buf.len()` bytes for the whole call.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }

    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(buf.get(..len)?).trim().to_owned();
    (!name.is_empty()).then_some(name)
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok().filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    fn suffix(id: &str) -> u64 {
        id.rsplit('-').next().unwrap().parse().unwrap()
    }

    #[test]
    fn test_prefix_shape() {
        let generator = IdGenerator::with_hostname("api-7.example.com");
        let (host, random) = generator.prefix().split_once('/').unwrap();

        assert_eq!(host, "api-7.example.com");
        assert_eq!(random.len(), RANDOM_LEN);
        assert!(random.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_empty_hostname_falls_back() {
        let generator = IdGenerator::with_hostname("");
        assert!(generator.prefix().starts_with("localhost/"));
    }

    #[test]
    fn test_system_hostname_is_never_empty() {
        let generator = IdGenerator::new();
        let (host, _) = generator.prefix().rsplit_once('/').unwrap();
        assert!(!host.is_empty());
    }

    #[test]
    fn test_first_ids_are_zero_padded() {
        let generator = IdGenerator::with_hostname("h");
        let prefix = generator.prefix().to_owned();

        assert_eq!(generator.next_id(), format!("{prefix}-000001"));
        assert_eq!(generator.next_id(), format!("{prefix}-000002"));
    }

    #[test]
    fn test_counter_is_not_truncated_past_six_digits() {
        let generator = IdGenerator::with_hostname("h");
        generator.counter.store(1_234_566, Ordering::Relaxed);

        assert!(generator.next_id().ends_with("-1234567"));
    }

    #[test]
    fn test_counter_wraps_instead_of_panicking() {
        let generator = IdGenerator::with_hostname("h");
        generator.counter.store(u64::MAX, Ordering::Relaxed);

        assert!(generator.next_id().ends_with("-000000"));
    }

    #[test]
    fn test_serial_ids_increase_and_share_prefix() {
        let generator = IdGenerator::with_hostname("h");
        let ids: Vec<String> = (0..100).map(|_| generator.next_id()).collect();

        for pair in ids.windows(2) {
            assert!(suffix(&pair[1]) > suffix(&pair[0]));
        }
        assert!(ids.iter().all(|id| id.starts_with(generator.prefix())));
    }

    #[test]
    fn test_generators_draw_distinct_prefixes() {
        let a = IdGenerator::with_hostname("h");
        let b = IdGenerator::with_hostname("h");
        assert_ne!(a.prefix(), b.prefix());
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        const THREADS: usize = 16;
        const PER_THREAD: usize = 625;

        let generator = Arc::new(IdGenerator::with_hostname("h"));
        let ids: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let generator = Arc::clone(&generator);
                    s.spawn(move || {
                        (0..PER_THREAD).map(|_| generator.next_id()).collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(ids.len(), THREADS * PER_THREAD);
        assert_eq!(unique.len(), THREADS * PER_THREAD);

        let max = ids.iter().map(|id| suffix(id)).max().unwrap();
        assert_eq!(max, (THREADS * PER_THREAD) as u64);
    }
}
