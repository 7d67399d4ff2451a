//! Server-side session store. A session maps an opaque cookie token to a
//! denormalized identity snapshot with an absolute expiry. The snapshot is a
//! copy, not a live reference: it goes stale until re-login or an explicit
//! [`SessionManager::refresh`] from the profile-edit path.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// What a session remembers about the user at issuance time. Authorization
/// decisions that depend on current state must re-fetch the user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    identity: Identity,
    expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Create a session for the given identity and return its cookie token.
    pub fn issue(&self, identity: Identity) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let entry = SessionEntry {
            identity,
            expires_at: OffsetDateTime::now_utc() + self.ttl,
        };
        self.inner
            .write()
            .expect("session store lock poisoned")
            .insert(token.clone(), entry);
        token
    }

    /// Look up a token. Unknown and expired tokens both read as anonymous;
    /// expired entries are evicted on the way out.
    pub fn resolve(&self, token: &str) -> Option<Identity> {
        let now = OffsetDateTime::now_utc();
        {
            let sessions = self.inner.read().expect("session store lock poisoned");
            match sessions.get(token) {
                Some(entry) if now < entry.expires_at => return Some(entry.identity.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.inner
            .write()
            .expect("session store lock poisoned")
            .remove(token);
        None
    }

    /// Drop a session. Destroying an absent session is not an error.
    pub fn destroy(&self, token: &str) {
        self.inner
            .write()
            .expect("session store lock poisoned")
            .remove(token);
    }

    /// Patch the identity snapshot of a live session without extending its
    /// expiry. Returns false if the session is unknown or already expired.
    pub fn refresh(&self, token: &str, identity: Identity) -> bool {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.inner.write().expect("session store lock poisoned");
        match sessions.get_mut(token) {
            Some(entry) if now < entry.expires_at => {
                entry.identity = identity;
                true
            }
            _ => false,
        }
    }

    /// Session lifetime in whole seconds, for the cookie Max-Age.
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.whole_seconds()
    }
}
