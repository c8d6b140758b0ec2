//! Single-slot session store for the protected page.
//!
//! Exactly one session exists server-wide. Logging in from anywhere replaces
//! it, and a session is only honoured for the client IP it was issued to.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;
use std::net::IpAddr;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};

/// Default session lifetime in minutes.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;

/// Generate a session token: 32 random bytes from the OS-seeded CSPRNG, hex-encoded.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    hex::encode(bytes)
}

/// The active session. Stored as `Option<Session>` so a partial session cannot exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub ip_address: IpAddr,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Expired at or after `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    fn token_matches(&self, token: &str) -> bool {
        self.token.as_bytes().ct_eq(token.as_bytes()).into()
    }
}

/// Thread-safe holder of the single active session.
pub struct SessionStore {
    slot: Mutex<Option<Session>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(DEFAULT_SESSION_TTL_MINUTES))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a session bound to `client_ip` and return its token.
    /// Any previous session, for any client, is discarded.
    pub fn create_session(&self, client_ip: IpAddr) -> String {
        let token = generate_token();
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let previous = self.slot.lock().replace(Session {
            token: token.clone(),
            ip_address: client_ip,
            expires_at,
        });

        if let Some(prev) = previous {
            debug!(previous_ip = %prev.ip_address, "Replacing active session");
        }
        info!(ip = %client_ip, %expires_at, "Session created");

        token
    }

    /// Check a presented token and client IP against the active session.
    ///
    /// Side effect: an expired session is cleared, so later calls fail even
    /// with the correct token. A token or IP mismatch leaves the session untouched.
    pub fn is_session_valid(&self, token: &str, client_ip: IpAddr) -> bool {
        let mut slot = self.slot.lock();
        let Some(session) = slot.as_ref() else {
            return false;
        };

        if !session.token_matches(token) || session.ip_address != client_ip {
            return false;
        }

        if session.is_expired(self.clock.now()) {
            info!(ip = %session.ip_address, "Session expired");
            *slot = None;
            return false;
        }

        true
    }

    /// Clear the session if it has expired. Returns true if something was cleared.
    pub fn clear_if_expired(&self) -> bool {
        let mut slot = self.slot.lock();
        let expired = slot
            .as_ref()
            .is_some_and(|session| session.is_expired(self.clock.now()));
        if expired {
            *slot = None;
        }
        expired
    }

    /// Remove the session if `token` is the active one (logout).
    pub fn remove(&self, token: &str) -> bool {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|s| s.token_matches(token)) {
            *slot = None;
            return true;
        }
        false
    }

    /// Snapshot of the active session, if any.
    pub fn current(&self) -> Option<Session> {
        self.slot.lock().clone()
    }
}
