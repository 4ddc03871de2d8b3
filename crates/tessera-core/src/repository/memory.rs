//! In-memory implementation of the repository contracts.
//!
//! Used by tests and local runs. Commits are serialized by a single lock
//! and re-check email uniqueness, standing in for a storage-level UNIQUE
//! index. A revocation applies only to a session that is still unrevoked.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AuthRepository, AuthStore, UnitOfWork, UserPatch, Write, WriteLog};
use crate::error::{CoreError, CoreResult};
use crate::models::{session::Session, user::User};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
}

/// Shared in-memory storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuthStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed users.
    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }

    /// Number of committed sessions.
    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }

    /// Committed sessions owned by `user_id`.
    pub async fn sessions_for(&self, user_id: Uuid) -> Vec<Session> {
        self.tables
            .lock()
            .await
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl AuthStore for MemoryAuthStore {
    type Unit = MemoryUnitOfWork;

    fn begin(&self) -> MemoryUnitOfWork {
        MemoryUnitOfWork {
            tables: Arc::clone(&self.tables),
            log: Mutex::new(WriteLog::default()),
        }
    }
}

/// One transactional scope over a [`MemoryAuthStore`].
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    tables: Arc<Mutex<Tables>>,
    log: Mutex<WriteLog>,
}

impl AuthRepository for MemoryUnitOfWork {
    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let mut log = self.log.lock().await;
        if let Some(user) = log.user_by_email(email) {
            return Ok(Some(user.clone()));
        }
        let found = self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned();
        if let Some(user) = &found {
            log.remember_user(user);
        }
        Ok(found)
    }

    async fn add_user(&self, user: &User) -> CoreResult<()> {
        self.log.lock().await.stage_user(user);
        Ok(())
    }

    async fn flush(&self) -> CoreResult<()> {
        self.log.lock().await.flush();
        Ok(())
    }

    async fn add_session(&self, session: &Session) -> CoreResult<()> {
        self.log.lock().await.stage_session(session);
        Ok(())
    }

    async fn find_session_by_token_hash(&self, token_hash: &str) -> CoreResult<Option<Session>> {
        let mut log = self.log.lock().await;
        if let Some(session) = log.session_by_token_hash(token_hash) {
            return Ok(Some(session.clone()));
        }
        let found = self
            .tables
            .lock()
            .await
            .sessions
            .values()
            .find(|s| s.token_hash == token_hash)
            .cloned();
        if let Some(session) = &found {
            log.remember_session(session);
        }
        Ok(found)
    }

    async fn find_user_by_id(&self, id: Uuid) -> CoreResult<Option<User>> {
        let mut log = self.log.lock().await;
        if let Some(user) = log.user_by_id(id) {
            return Ok(Some(user.clone()));
        }
        let found = self.tables.lock().await.users.get(&id).cloned();
        if let Some(user) = &found {
            log.remember_user(user);
        }
        Ok(found)
    }
}

impl Tables {
    fn email_taken(&self, email: &str, by_other_than: Uuid) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && u.id != by_other_than)
    }

    /// Check one write against committed state without applying it.
    fn check(&self, write: &Write) -> CoreResult<()> {
        let conflict = |entity: &str| {
            Err(CoreError::AlreadyExists {
                entity: entity.into(),
            })
        };
        match write {
            Write::PutUser(user) if self.email_taken(&user.email, user.id) => conflict("user"),
            Write::PatchUser {
                id,
                patch: UserPatch {
                    email: Some(email), ..
                },
            } if self.email_taken(email, *id) => conflict("user"),
            Write::PutSession(session)
                if self
                    .sessions
                    .values()
                    .any(|s| s.token_hash == session.token_hash && s.id != session.id) =>
            {
                conflict("session")
            }
            Write::RevokeSession { id, .. }
                if !self.sessions.get(id).is_some_and(|s| s.revoked_at.is_none()) =>
            {
                Err(CoreError::StaleWrite {
                    entity: "session".into(),
                })
            }
            _ => Ok(()),
        }
    }

    fn apply(&mut self, write: Write) {
        match write {
            Write::PutUser(user) => {
                self.users.insert(user.id, user);
            }
            Write::PatchUser { id, patch } => {
                if let Some(user) = self.users.get_mut(&id) {
                    patch.apply_to(user);
                }
            }
            Write::PutSession(session) => {
                self.sessions.insert(session.id, session);
            }
            Write::RevokeSession { id, revoked_at } => {
                if let Some(session) = self.sessions.get_mut(&id) {
                    session.revoked_at = Some(revoked_at);
                }
            }
        }
    }
}

impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self) -> CoreResult<()> {
        let writes = self.log.into_inner().into_writes();
        let mut tables = self.tables.lock().await;

        // Validate everything before applying anything.
        for write in &writes {
            tables.check(write)?;
        }
        for write in writes {
            tables.apply(write);
        }
        Ok(())
    }
}
