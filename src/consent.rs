//! Privacy-consent state and its persistence.
//!
//! A user's decision is a single named token, `privacy-consent`, holding
//! either `accepted` or `rejected` for 365 days. Anything else — no token, an
//! expired token, a tampered value, or a context with no client storage at
//! all — reads as [`ConsentState::Unknown`].
//!
//! [`ConsentStore`] implements the decision logic over a
//! [`ConsentPersistence`] chosen at construction time:
//!
//! * [`CookieJar`] — one HTTP request's `Cookie` header in, `Set-Cookie`
//!   directives out. Used by the `/api/consent` endpoints.
//! * [`MemoryPersistence`] — a process-local session slot that honours the
//!   validity window.
//! * [`Unavailable`] — no client storage (server-side rendering); reads are
//!   always unknown and writes are dropped.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

/// Name of the persisted consent token.
pub const CONSENT_COOKIE_NAME: &str = "privacy-consent";

/// How long a decision stays valid.
pub const CONSENT_VALIDITY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

const ACCEPTED: &str = "accepted";
const REJECTED: &str = "rejected";

/// The user's privacy-consent decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentState {
    Accepted,
    Rejected,
    /// No decision on record, or the record is unreadable.
    #[default]
    Unknown,
}

impl ConsentState {
    /// Decode a stored token. Only the two exact literals are definite.
    pub fn from_token(token: Option<&str>) -> Self {
        match token.map(str::trim) {
            Some(ACCEPTED) => ConsentState::Accepted,
            Some(REJECTED) => ConsentState::Rejected,
            _ => ConsentState::Unknown,
        }
    }

    pub fn from_decision(accepted: bool) -> Self {
        if accepted {
            ConsentState::Accepted
        } else {
            ConsentState::Rejected
        }
    }

    /// The literal persisted for this state; `None` for `Unknown`.
    pub fn as_token(self) -> Option<&'static str> {
        match self {
            ConsentState::Accepted => Some(ACCEPTED),
            ConsentState::Rejected => Some(REJECTED),
            ConsentState::Unknown => None,
        }
    }
}

impl fmt::Display for ConsentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token().unwrap_or("unknown"))
    }
}

/// Storage medium behind a [`ConsentStore`].
///
/// Implementations hold at most one token. They must be `Send + Sync` so a
/// store can live in shared server state.
pub trait ConsentPersistence: Send + Sync {
    /// Whether this medium is reachable at all. Unavailable media read as
    /// absent.
    fn is_available(&self) -> bool {
        true
    }

    /// The raw stored value, if any and not expired.
    fn read(&self) -> Option<String>;

    /// Store `value`, valid for `max_age`, replacing any previous value.
    fn write(&self, value: &str, max_age: Duration);

    /// Expire the stored value immediately.
    fn erase(&self);
}

/// Consent decision logic over an injected persistence strategy.
///
/// # Example
/// ```rust
/// use pdf2csv_proxy::consent::{ConsentState, ConsentStore, MemoryPersistence};
///
/// let store = ConsentStore::new(MemoryPersistence::new());
/// assert_eq!(store.get_consent(), ConsentState::Unknown);
///
/// store.set_consent(true);
/// assert!(store.is_accepted());
///
/// store.clear_consent();
/// assert!(!store.has_consent());
/// ```
#[derive(Debug, Default)]
pub struct ConsentStore<P> {
    persistence: P,
}

impl<P: ConsentPersistence> ConsentStore<P> {
    pub fn new(persistence: P) -> Self {
        Self { persistence }
    }

    /// Record an explicit decision for [`CONSENT_VALIDITY`].
    pub fn set_consent(&self, accepted: bool) {
        let state = ConsentState::from_decision(accepted);
        if let Some(token) = state.as_token() {
            self.persistence.write(token, CONSENT_VALIDITY);
        }
        debug!(consent = %state, "Consent recorded");
    }

    pub fn get_consent(&self) -> ConsentState {
        if !self.persistence.is_available() {
            return ConsentState::Unknown;
        }
        ConsentState::from_token(self.persistence.read().as_deref())
    }

    /// True once the user decided either way.
    pub fn has_consent(&self) -> bool {
        self.get_consent() != ConsentState::Unknown
    }

    pub fn is_accepted(&self) -> bool {
        self.get_consent() == ConsentState::Accepted
    }

    pub fn clear_consent(&self) {
        self.persistence.erase();
        debug!("Consent cleared");
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Cookie jar ───────────────────────────────────────────────────────────

/// Cookie-backed persistence for one HTTP exchange.
///
/// Seeded from the request's `Cookie` header(s); every write or erase is
/// recorded as a `Set-Cookie` directive for the response and is reflected in
/// subsequent reads on the same jar.
#[derive(Debug, Default)]
pub struct CookieJar {
    current: Mutex<Option<String>>,
    pending: Mutex<Vec<String>>,
}

impl CookieJar {
    /// A jar with nothing stored.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A jar seeded from every `Cookie` header in `headers`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let current = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(find_consent_cookie);
        Self {
            current: Mutex::new(current),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// `Set-Cookie` values produced so far, oldest first.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        lock(&self.pending).clone()
    }

    /// Append the pending `Set-Cookie` directives to a response header map.
    pub fn apply_to(&self, headers: &mut HeaderMap) {
        for directive in lock(&self.pending).iter() {
            if let Ok(value) = HeaderValue::from_str(directive) {
                headers.append(SET_COOKIE, value);
            }
        }
    }
}

impl ConsentPersistence for CookieJar {
    fn read(&self) -> Option<String> {
        lock(&self.current).clone()
    }

    fn write(&self, value: &str, max_age: Duration) {
        *lock(&self.current) = Some(value.to_string());
        lock(&self.pending).push(set_cookie_directive(value, max_age));
    }

    fn erase(&self) {
        *lock(&self.current) = None;
        lock(&self.pending).push(expire_cookie_directive());
    }
}

/// Find the consent value in one `Cookie` header (`a=1; privacy-consent=x`).
fn find_consent_cookie(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            (name.trim() == CONSENT_COOKIE_NAME).then(|| value.trim().to_string())
        })
}

fn set_cookie_directive(value: &str, max_age: Duration) -> String {
    [
        format!("{CONSENT_COOKIE_NAME}={value}"),
        format!("Max-Age={}", max_age.as_secs()),
        "Path=/".to_string(),
        "SameSite=Strict".to_string(),
    ]
    .join("; ")
}

fn expire_cookie_directive() -> String {
    [
        format!("{CONSENT_COOKIE_NAME}="),
        "Max-Age=0".to_string(),
        "Expires=Thu, 01 Jan 1970 00:00:00 GMT".to_string(),
        "Path=/".to_string(),
        "SameSite=Strict".to_string(),
    ]
    .join("; ")
}

// ── In-memory session ────────────────────────────────────────────────────

/// Process-local persistence with expiry.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slot: Mutex<Option<(String, Instant)>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsentPersistence for MemoryPersistence {
    fn read(&self) -> Option<String> {
        let mut slot = lock(&self.slot);
        match slot.as_ref() {
            Some((_, expires_at)) if Instant::now() >= *expires_at => {
                *slot = None;
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    fn write(&self, value: &str, max_age: Duration) {
        let now = Instant::now();
        // Instant overflow on absurd ages: keep it effectively forever.
        let expires_at = now
            .checked_add(max_age)
            .unwrap_or_else(|| now + CONSENT_VALIDITY);
        *lock(&self.slot) = Some((value.to_string(), expires_at));
    }

    fn erase(&self) {
        *lock(&self.slot) = None;
    }
}

// ── No storage ───────────────────────────────────────────────────────────

/// A context without client storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl ConsentPersistence for Unavailable {
    fn is_available(&self) -> bool {
        false
    }

    fn read(&self) -> Option<String> {
        None
    }

    fn write(&self, _value: &str, _max_age: Duration) {}

    fn erase(&self) {}
}
