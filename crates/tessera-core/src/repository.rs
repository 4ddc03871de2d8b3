//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. A request works against one
//! [`UnitOfWork`] opened from an [`AuthStore`]: writes are staged, reads
//! see staged writes first, and nothing reaches shared storage until
//! [`UnitOfWork::commit`]. Dropping an uncommitted unit of work rolls it
//! back.
//!
//! Rows a unit read from storage are committed as patches: only the
//! fields it changed are written, and a session's `revoked_at` is set
//! only if it is still unset.

pub mod memory;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::{session::Session, user::User};

pub use memory::{MemoryAuthStore, MemoryUnitOfWork};

/// Persistence operations needed by the auth service.
///
/// Implementations carry no business rules: no validation, no expiry
/// checks, no normalization.
pub trait AuthRepository: Send + Sync {
    /// Look up a user by an already-normalized email.
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = CoreResult<Option<User>>> + Send;
    /// Stage an insert, or mark an existing user dirty for update.
    fn add_user(&self, user: &User) -> impl Future<Output = CoreResult<()>> + Send;
    /// Make staged writes visible and ordered before anything staged later.
    fn flush(&self) -> impl Future<Output = CoreResult<()>> + Send;
    /// Stage an insert, or mark an existing session dirty for update.
    fn add_session(&self, session: &Session) -> impl Future<Output = CoreResult<()>> + Send;
    fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = CoreResult<Option<Session>>> + Send;
    fn find_user_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<Option<User>>> + Send;
}

/// A transactional scope that can be committed exactly once.
pub trait UnitOfWork: AuthRepository {
    /// Apply all staged writes atomically.
    ///
    /// A uniqueness violation on a user's email is reported as
    /// `CoreError::AlreadyExists { entity: "user" }`. Revoking a session
    /// that another unit revoked first is reported as
    /// `CoreError::StaleWrite { entity: "session" }`.
    fn commit(self) -> impl Future<Output = CoreResult<()>> + Send;
}

/// Shared handle to a storage backend; opens one unit of work per request.
pub trait AuthStore: Clone + Send + Sync + 'static {
    type Unit: UnitOfWork + 'static;

    fn begin(&self) -> Self::Unit;
}

/// Staged writes of one unit of work, in the order they must be applied.
#[derive(Debug, Default)]
pub struct WriteLog {
    users: Vec<User>,
    sessions: Vec<Session>,
    /// Writes staged after the last flush.
    pending_users: Vec<User>,
    pending_sessions: Vec<Session>,
    /// Rows as first read from storage by this unit.
    loaded_users: HashMap<Uuid, User>,
    loaded_sessions: HashMap<Uuid, Session>,
}

/// Changed fields of a user that already exists in storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub last_login_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

impl UserPatch {
    /// Fields that differ between `before` and `after`. `id` and
    /// `created_at` are immutable and never patched.
    pub fn between(before: &User, after: &User) -> Self {
        Self {
            email: (before.email != after.email).then(|| after.email.clone()),
            last_login_at: (before.last_login_at != after.last_login_at)
                .then_some(after.last_login_at),
            is_active: (before.is_active != after.is_active).then_some(after.is_active),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.last_login_at.is_none() && self.is_active.is_none()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(last_login_at) = self.last_login_at {
            user.last_login_at = last_login_at;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
    }
}

/// One staged write, as handed to an adapter at commit time.
#[derive(Debug, Clone)]
pub enum Write {
    /// Whole row of a user this unit did not read from storage.
    PutUser(User),
    /// Only the changed fields of a user read from storage.
    PatchUser { id: Uuid, patch: UserPatch },
    /// Whole row of a new session.
    PutSession(Session),
    /// Set `revoked_at` on a stored session, only if it is still unset.
    RevokeSession { id: Uuid, revoked_at: DateTime<Utc> },
}

impl WriteLog {
    pub fn stage_user(&mut self, user: &User) {
        upsert_by(&mut self.pending_users, user.clone(), |u| u.id);
    }

    pub fn stage_session(&mut self, session: &Session) {
        upsert_by(&mut self.pending_sessions, session.clone(), |s| s.id);
    }

    /// Record a user as read from storage. The first read wins.
    pub fn remember_user(&mut self, user: &User) {
        self.loaded_users
            .entry(user.id)
            .or_insert_with(|| user.clone());
    }

    /// Record a session as read from storage. The first read wins.
    pub fn remember_session(&mut self, session: &Session) {
        self.loaded_sessions
            .entry(session.id)
            .or_insert_with(|| session.clone());
    }

    /// Move pending writes into the flushed log: users before sessions.
    pub fn flush(&mut self) {
        for user in self.pending_users.drain(..) {
            upsert_by(&mut self.users, user, |u| u.id);
        }
        for session in self.pending_sessions.drain(..) {
            upsert_by(&mut self.sessions, session, |s| s.id);
        }
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.staged_users().find(|u| u.email == email)
    }

    pub fn user_by_id(&self, id: Uuid) -> Option<&User> {
        self.staged_users().find(|u| u.id == id)
    }

    pub fn session_by_token_hash(&self, token_hash: &str) -> Option<&Session> {
        self.pending_sessions
            .iter()
            .chain(self.sessions.iter())
            .find(|s| s.token_hash == token_hash)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.sessions.is_empty()
            && self.pending_users.is_empty()
            && self.pending_sessions.is_empty()
    }

    /// Flush and hand back every write in application order. Rows read
    /// from storage become patches; unchanged rows produce no write.
    pub fn into_writes(mut self) -> Vec<Write> {
        self.flush();
        let Self {
            users,
            sessions,
            loaded_users,
            loaded_sessions,
            ..
        } = self;

        let users = users.into_iter().filter_map(|user| match loaded_users.get(&user.id) {
            None => Some(Write::PutUser(user)),
            Some(before) => {
                let patch = UserPatch::between(before, &user);
                (!patch.is_empty()).then_some(Write::PatchUser { id: user.id, patch })
            }
        });
        // Stored sessions are immutable apart from revocation.
        let sessions = sessions.into_iter().filter_map(|session| {
            match loaded_sessions.get(&session.id) {
                None => Some(Write::PutSession(session)),
                Some(before) => match (before.revoked_at, session.revoked_at) {
                    (None, Some(revoked_at)) => Some(Write::RevokeSession {
                        id: session.id,
                        revoked_at,
                    }),
                    _ => None,
                },
            }
        });
        users.chain(sessions).collect()
    }

    // Pending entries shadow flushed ones with the same id.
    fn staged_users(&self) -> impl Iterator<Item = &User> {
        self.pending_users.iter().chain(self.users.iter())
    }
}

fn upsert_by<T, F>(items: &mut Vec<T>, item: T, key: F)
where
    F: Fn(&T) -> Uuid,
{
    let id = key(&item);
    match items.iter_mut().find(|existing| key(existing) == id) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}
