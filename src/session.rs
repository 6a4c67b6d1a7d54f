use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

/// Lifetime Spotify gives an access token. Informational only, never enforced here.
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

/// A bearer token obtained from the OAuth exchange
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    token: String,
    issued_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self::issued_at(token, Utc::now())
    }

    pub fn issued_at(token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Credential {
            token: token.into(),
            issued_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(TOKEN_LIFETIME_SECS)
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Shared handle to the signed-in user's credential.
///
/// Clones share the same slot, so a logout through one handle is seen by
/// every component that was given a clone.
#[derive(Debug, Clone, Default)]
pub struct Session {
    slot: Arc<RwLock<Option<Credential>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.store(Credential::new(token));
        session
    }

    pub fn is_present(&self) -> bool {
        self.credential().is_some()
    }

    /// Current credential, if a non-empty one is stored
    pub fn credential(&self) -> Option<Credential> {
        let guard = match self.slot.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("[Session] Lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.clone().filter(|c| !c.token.is_empty())
    }

    pub fn store(&self, credential: Credential) {
        log::debug!("[Session] Storing credential (expires {})", credential.expires_at());
        match self.slot.write() {
            Ok(mut guard) => *guard = Some(credential),
            Err(poisoned) => *poisoned.into_inner() = Some(credential),
        }
    }

    pub fn logout(&self) {
        log::info!("[Session] Clearing credential");
        match self.slot.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}
