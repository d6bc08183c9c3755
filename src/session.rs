//! In-memory per-user sessions keyed by an opaque cookie token.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::models::ItemDetails;

#[derive(Debug, Clone)]
pub struct SessionLimits {
    pub ttl: Duration,
    pub max_per_ip: usize,
    pub max_total: usize,
    /// Expired sessions are swept once every this many accesses.
    pub cleanup_interval: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_per_ip: 5,
            max_total: 1000,
            cleanup_interval: 100,
        }
    }
}

/// State remembered between requests of one user.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub category: Option<String>,
    pub language: String,
    pub items: Vec<String>,
    pub properties: Vec<String>,
    pub details_cache: HashMap<String, ItemDetails>,
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            category: None,
            language: "en".to_string(),
            items: Vec::new(),
            properties: Vec::new(),
            details_cache: HashMap::new(),
        }
    }
}

struct Session {
    data: SessionData,
    ip: String,
    created_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
}

impl Session {
    fn new(ip: &str, now: DateTime<Utc>) -> Self {
        Self {
            data: SessionData::default(),
            ip: ip.to_string(),
            created_at: now,
            last_access: now,
        }
    }
}

/// Result of [`SessionStore::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedSession {
    pub id: String,
    /// True when the client has to be handed a new cookie.
    pub issued: bool,
}

#[derive(Default)]
struct SessionMap {
    sessions: HashMap<String, Session>,
    access_counter: u64,
}

pub struct SessionStore {
    limits: SessionLimits,
    inner: Mutex<SessionMap>,
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            limits,
            inner: Mutex::new(SessionMap::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up the caller's session, issuing a new one when the token is missing,
    /// unknown or expired.
    pub fn open(&self, session_id: Option<&str>, ip: &str) -> OpenedSession {
        self.open_at(session_id, ip, Utc::now())
    }

    pub fn open_at(&self, session_id: Option<&str>, ip: &str, now: DateTime<Utc>) -> OpenedSession {
        let mut guard = self.inner.lock();
        guard.access_counter += 1;
        if guard.access_counter >= self.limits.cleanup_interval {
            guard.access_counter = 0;
            self.sweep(&mut guard, now);
        }

        let ttl = self.ttl();
        if let Some(id) = session_id.filter(|id| !id.is_empty()) {
            let expired_since = guard
                .sessions
                .get(id)
                .filter(|session| now - session.last_access > ttl)
                .map(|session| session.created_at);
            if let Some(created_at) = expired_since {
                debug!(session = %id, %created_at, "session expired, issuing a new one");
                guard.sessions.remove(id);
            } else if let Some(session) = guard.sessions.get_mut(id) {
                session.last_access = now;
                return OpenedSession {
                    id: id.to_string(),
                    issued: false,
                };
            } else {
                debug!("unknown session token, issuing a new one");
            }
        }

        // Unknown and expired tokens land here too; ids are always minted server-side.
        self.enforce_ip_quota(&mut guard, ip);
        if guard.sessions.len() >= self.limits.max_total {
            evict_oldest(&mut guard.sessions, |_| true);
        }
        let id = Uuid::new_v4().to_string();
        guard.sessions.insert(id.clone(), Session::new(ip, now));
        OpenedSession { id, issued: true }
    }

    /// Runs `f` against the session data, if the session still exists.
    pub fn with_session<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionData) -> R) -> Option<R> {
        let mut guard = self.inner.lock();
        guard.sessions.get_mut(session_id).map(|session| f(&mut session.data))
    }

    pub fn snapshot(&self, session_id: &str) -> Option<SessionData> {
        self.with_session(session_id, |data| data.clone())
    }

    /// Drops expired sessions, then the least recently used ones above the cap.
    pub fn cleanup_at(&self, now: DateTime<Utc>) {
        let mut guard = self.inner.lock();
        self.sweep(&mut guard, now);
    }

    pub fn clear(&self) {
        self.inner.lock().sessions.clear();
    }

    fn ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.limits.ttl).unwrap_or_else(|_| chrono::Duration::days(365))
    }

    fn sweep(&self, map: &mut SessionMap, now: DateTime<Utc>) {
        let ttl = self.ttl();
        let before = map.sessions.len();
        map.sessions.retain(|_, session| now - session.last_access <= ttl);

        if map.sessions.len() > self.limits.max_total {
            let mut by_age: Vec<(String, DateTime<Utc>)> = map
                .sessions
                .iter()
                .map(|(id, session)| (id.clone(), session.last_access))
                .collect();
            by_age.sort_by_key(|(_, last_access)| *last_access);
            let excess = map.sessions.len() - self.limits.max_total;
            for (id, _) in by_age.into_iter().take(excess) {
                map.sessions.remove(&id);
            }
        }

        let removed = before - map.sessions.len();
        if removed > 0 {
            info!(removed, remaining = map.sessions.len(), "Session cleanup");
        }
    }

    fn enforce_ip_quota(&self, map: &mut SessionMap, ip: &str) {
        let owned = map.sessions.values().filter(|session| session.ip == ip).count();
        if owned >= self.limits.max_per_ip {
            debug!(%ip, owned, "per-IP session quota reached, evicting oldest");
            evict_oldest(&mut map.sessions, |session| session.ip == ip);
        }
    }
}

fn evict_oldest(sessions: &mut HashMap<String, Session>, filter: impl Fn(&Session) -> bool) {
    let oldest = sessions
        .iter()
        .filter(|(_, session)| filter(session))
        .min_by_key(|(_, session)| session.last_access)
        .map(|(id, _)| id.clone());
    if let Some(id) = oldest {
        sessions.remove(&id);
    }
}
