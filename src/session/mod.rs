// Server-side console sessions
//
// A session is bound to the host it was created on and carries the sign-in
// state machine. All transitions go through `SessionStore::update`, which runs
// under the store's write lock.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{AuthErrorCode, IdentityClaims, PkcePair, Role, RoleSet, TokenSet};
use crate::types::UserProfile;

/// One in-flight sign-in attempt
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLogin {
    pub state: String,
    pub pkce: PkcePair,
    /// Path (and query) the user asked for before being sent to sign in
    pub return_to: String,
    pub tenant_id: Option<String>,
    /// Role picked on the signup page, submitted to the backend after the callback
    pub registration: Option<Role>,
    pub started_at: DateTime<Utc>,
}

impl PendingLogin {
    pub fn new(return_to: String, tenant_id: Option<String>, registration: Option<Role>) -> Self {
        Self {
            state: Uuid::new_v4().simple().to_string(),
            pkce: PkcePair::generate(),
            return_to,
            tenant_id,
            registration,
            started_at: Utc::now(),
        }
    }
}

/// Signed-in user: provider identity merged with the backend profile
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub profile: UserProfile,
    pub roles: RoleSet,
    pub tenant_id: Option<String>,
    #[serde(skip)]
    pub tokens: TokenSet,
}

impl Principal {
    pub fn new(identity: IdentityClaims, profile: UserProfile, tenant_id: Option<String>, tokens: TokenSet) -> Self {
        let roles = RoleSet::from_profile(&profile);
        Self {
            email: identity.email.or_else(|| profile.email.clone()),
            name: identity.name.or_else(|| profile.name.clone()),
            subject: identity.sub,
            profile,
            roles,
            tenant_id,
            tokens,
        }
    }

    pub fn home_path(&self) -> &'static str {
        self.roles.home_path()
    }
}

#[derive(Debug, Clone, Default)]
pub enum GateState {
    #[default]
    Unauthenticated,
    PendingLogin(PendingLogin),
    /// Code exchanged, profile not yet loaded
    LoadingProfile {
        tokens: TokenSet,
        identity: IdentityClaims,
        return_to: String,
        tenant_id: Option<String>,
        started_at: DateTime<Utc>,
    },
    Ready(Box<Principal>),
    Failed(AuthErrorCode),
}

impl GateState {
    pub fn name(&self) -> &'static str {
        match self {
            GateState::Unauthenticated => "unauthenticated",
            GateState::PendingLogin(_) => "pending-login",
            GateState::LoadingProfile { .. } => "loading-profile",
            GateState::Ready(_) => "ready",
            GateState::Failed(_) => "failed",
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            GateState::Ready(principal) => Some(principal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub host: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub state: GateState,
}

impl Session {
    fn new(host: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            host: host.to_string(),
            created_at: now,
            last_seen: now,
            state: GateState::Unauthenticated,
        }
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    fn is_live(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.last_seen < self.idle_ttl
    }

    /// Existing live session for `id` on `host`, or a fresh unauthenticated one
    pub async fn load(&self, id: Option<Uuid>, host: &str) -> Session {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        if let Some(id) = id {
            match sessions.get_mut(&id) {
                Some(session) if session.host == host && now - session.last_seen < self.idle_ttl => {
                    session.last_seen = now;
                    return session.clone();
                }
                Some(_) => {
                    tracing::debug!("Discarding stale or foreign-host session {}", id);
                    sessions.remove(&id);
                }
                None => {}
            }
        }

        let session = Session::new(host);
        tracing::debug!("Created session {} for host {}", session.id, host);
        sessions.insert(session.id, session.clone());
        session
    }

    /// Live session by id without touching it
    pub async fn get(&self, id: Uuid) -> Option<Session> {
        let now = Utc::now();
        let sessions = self.sessions.read().await;
        sessions.get(&id).filter(|s| self.is_live(s, now)).cloned()
    }

    /// Live session by id, marking it as active
    pub async fn touch(&self, id: Uuid) -> Option<Session> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).filter(|s| now - s.last_seen < self.idle_ttl)?;
        session.last_seen = now;
        Some(session.clone())
    }

    /// Apply `f` to the session under the write lock; None when the session is gone
    pub async fn update<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id)?;
        session.last_seen = Utc::now();
        Some(f(session))
    }

    pub async fn remove(&self, id: Uuid) -> Option<Session> {
        self.sessions.write().await.remove(&id)
    }

    /// Drop sessions idle past the TTL, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| now - s.last_seen < self.idle_ttl);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
