//! Session Store
//!
//! Holds the bearer credential and user identity for the whole process. All
//! other components hold a read-only handle; the session is written only by
//! the login flow (`set`) and destroyed only through `clear`. `clear` is
//! idempotent and emits exactly one logout signal no matter how many
//! components detect the same expiry concurrently.
//!
//! The token and profile are the only client-side durable state: they are
//! persisted to a JSON file so a restart resumes the authenticated session.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Authenticated user profile as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Server-assigned user id.
    pub id: i64,
    /// Account email.
    pub email: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Optional avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// An authenticated session: opaque bearer token plus identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token.
    pub token: String,
    /// Profile of the authenticated user.
    pub user: UserProfile,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

struct Inner {
    session: RwLock<Option<Session>>,
    store_path: Option<PathBuf>,
    logout_tx: watch::Sender<u64>,
}

/// Shared handle to the process-wide session.
///
/// Cheap to clone; all clones observe the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Create an in-memory store with no session.
    #[must_use]
    pub fn new() -> Self {
        Self::with_inner(None, None)
    }

    /// Create a store backed by a JSON file, resuming any persisted session.
    ///
    /// An unreadable or malformed file is treated as logged-out rather than
    /// an error; the file is overwritten on the next login.
    #[must_use]
    pub fn load(path: PathBuf) -> Self {
        let session = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str::<Session>(&text).ok());

        if session.is_some() {
            tracing::debug!(path = %path.display(), "Resumed persisted session");
        }

        Self::with_inner(session, Some(path))
    }

    fn with_inner(session: Option<Session>, store_path: Option<PathBuf>) -> Self {
        let (logout_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                session: RwLock::new(session),
                store_path,
                logout_tx,
            }),
        }
    }

    /// Get the bearer token, if a session exists.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner.session.read().as_ref().map(|s| s.token.clone())
    }

    /// Get the authenticated user's id, if a session exists.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.inner.session.read().as_ref().map(|s| s.user.id)
    }

    /// Get the authenticated user's profile, if a session exists.
    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.inner.session.read().as_ref().map(|s| s.user.clone())
    }

    /// Whether a session currently exists.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.read().is_some()
    }

    /// Install a new session. Only the login/register flow calls this.
    pub fn set(&self, session: Session) {
        *self.inner.session.write() = Some(session.clone());
        self.persist(Some(&session));
        tracing::info!(user_id = session.user.id, "Session established");
    }

    /// Destroy the session. Idempotent: the first call removes the
    /// credential and emits one logout signal; later calls do nothing.
    ///
    /// Returns `true` if this call actually cleared a session.
    pub fn clear(&self) -> bool {
        let cleared = self.inner.session.write().take().is_some();
        if cleared {
            self.persist(None);
            self.inner.logout_tx.send_modify(|n| *n += 1);
            tracing::info!("Session cleared");
        }
        cleared
    }

    /// Subscribe to logout signals.
    ///
    /// The watch value increments once per actual logout; subscribers map a
    /// change to "redirect to login". Navigation itself is the caller's job.
    #[must_use]
    pub fn logout_signals(&self) -> watch::Receiver<u64> {
        self.inner.logout_tx.subscribe()
    }

    /// Number of logouts since the store was created.
    #[must_use]
    pub fn logout_count(&self) -> u64 {
        *self.inner.logout_tx.borrow()
    }

    fn persist(&self, session: Option<&Session>) {
        let Some(path) = &self.inner.store_path else {
            return;
        };

        let result = match session {
            Some(s) => serde_json::to_string_pretty(s)
                .map_err(std::io::Error::other)
                .and_then(|json| std::fs::write(path, json)),
            None => match std::fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        };

        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Failed to persist session");
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
