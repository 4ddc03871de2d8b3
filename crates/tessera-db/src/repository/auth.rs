//! SurrealDB implementation of [`AuthStore`] and [`UnitOfWork`].
//!
//! Reads go straight to the database (after consulting the unit's staged
//! writes). Writes are staged in memory and sent at commit as a single
//! `BEGIN TRANSACTION … COMMIT TRANSACTION` script, so a failed request
//! leaves nothing behind. The UNIQUE index on `user.email` is the
//! authoritative guard against concurrent duplicate registrations.
//!
//! Rows this unit read are written back as `UPDATE`s of the changed
//! fields only. A revocation updates only a session whose `revoked_at` is
//! still NONE and throws otherwise, which aborts the whole transaction.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::CoreResult;
use tessera_core::models::{session::Session, user::User};
use tessera_core::repository::{
    AuthRepository, AuthStore, UnitOfWork, UserPatch, Write, WriteLog,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::schema::{SESSION_TOKEN_INDEX, USER_EMAIL_INDEX};

/// DB-side user row including the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid user UUID: {e}")))?;
        Ok(User {
            id,
            email: self.email,
            created_at: self.created_at,
            last_login_at: self.last_login_at,
            is_active: self.is_active,
        })
    }
}

/// DB-side session row including the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    user_id: String,
    token_hash: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<Session, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid session UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Decode(format!("invalid user UUID: {e}")))?;
        Ok(Session {
            id,
            user_id,
            token_hash: self.token_hash,
            created_at: self.created_at,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
        })
    }
}

/// Thrown by a revocation that matched no unrevoked session.
const STALE_REVOCATION: &str = "stale_session_revocation";

/// Map a failed statement to a constraint violation when one of our
/// UNIQUE indexes or guards is named in the message.
fn classify(message: String) -> DbError {
    if message.contains(STALE_REVOCATION) {
        DbError::StaleWrite {
            entity: "session".into(),
        }
    } else if message.contains(USER_EMAIL_INDEX) {
        DbError::UniqueViolation {
            entity: "user".into(),
            index: USER_EMAIL_INDEX.into(),
        }
    } else if message.contains(SESSION_TOKEN_INDEX) {
        DbError::UniqueViolation {
            entity: "session".into(),
            index: SESSION_TOKEN_INDEX.into(),
        }
    } else {
        DbError::Transaction(message)
    }
}

/// SurrealDB-backed auth storage.
pub struct SurrealAuthStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealAuthStore<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealAuthStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuthStore for SurrealAuthStore<C> {
    type Unit = SurrealUnitOfWork<C>;

    fn begin(&self) -> SurrealUnitOfWork<C> {
        SurrealUnitOfWork {
            db: self.db.clone(),
            log: Mutex::new(WriteLog::default()),
        }
    }
}

/// One transactional scope over a [`SurrealAuthStore`].
pub struct SurrealUnitOfWork<C: Connection> {
    db: Surreal<C>,
    log: Mutex<WriteLog>,
}

impl<C: Connection> SurrealUnitOfWork<C> {
    async fn select_user(&self, query: &str, key: &str, value: String) -> CoreResult<Option<User>> {
        let mut result = self
            .db
            .query(query)
            .bind((key.to_string(), value))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let user = row.try_into_user()?;
        self.log.lock().await.remember_user(&user);
        Ok(Some(user))
    }
}

impl<C: Connection> AuthRepository for SurrealUnitOfWork<C> {
    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        if let Some(user) = self.log.lock().await.user_by_email(email) {
            return Ok(Some(user.clone()));
        }
        self.select_user(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE email = $email LIMIT 1",
            "email",
            email.to_string(),
        )
        .await
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
        if let Some(session) = self.log.lock().await.session_by_token_hash(token_hash) {
            return Ok(Some(session.clone()));
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE token_hash = $token_hash LIMIT 1",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let session = row.try_into_session()?;
        self.log.lock().await.remember_session(&session);
        Ok(Some(session))
    }

    async fn find_user_by_id(&self, id: Uuid) -> CoreResult<Option<User>> {
        if let Some(user) = self.log.lock().await.user_by_id(id) {
            return Ok(Some(user.clone()));
        }
        self.select_user(
            "SELECT meta::id(id) AS record_id, * FROM type::record('user', $id)",
            "id",
            id.to_string(),
        )
        .await
    }
}

impl<C: Connection> UnitOfWork for SurrealUnitOfWork<C> {
    async fn commit(self) -> CoreResult<()> {
        let log = self.log.into_inner();
        if log.is_empty() {
            return Ok(());
        }
        let writes = log.into_writes();
        if writes.is_empty() {
            return Ok(());
        }

        let mut script = String::from("BEGIN TRANSACTION;\n");
        for (i, write) in writes.iter().enumerate() {
            script.push_str(&statement(i, write));
        }
        script.push_str("COMMIT TRANSACTION;");

        let mut builder = self.db.query(&script);
        for (i, write) in writes.into_iter().enumerate() {
            match write {
                Write::PutUser(user) => {
                    builder = builder
                        .bind((format!("w{i}_id"), user.id.to_string()))
                        .bind((format!("w{i}_email"), user.email))
                        .bind((format!("w{i}_created_at"), user.created_at))
                        .bind((format!("w{i}_last_login_at"), user.last_login_at))
                        .bind((format!("w{i}_is_active"), user.is_active));
                }
                Write::PatchUser { id, patch } => {
                    builder = builder.bind((format!("w{i}_id"), id.to_string()));
                    if let Some(email) = patch.email {
                        builder = builder.bind((format!("w{i}_email"), email));
                    }
                    if let Some(last_login_at) = patch.last_login_at {
                        builder = builder.bind((format!("w{i}_last_login_at"), last_login_at));
                    }
                    if let Some(is_active) = patch.is_active {
                        builder = builder.bind((format!("w{i}_is_active"), is_active));
                    }
                }
                Write::PutSession(session) => {
                    builder = builder
                        .bind((format!("w{i}_id"), session.id.to_string()))
                        .bind((format!("w{i}_user_id"), session.user_id.to_string()))
                        .bind((format!("w{i}_token_hash"), session.token_hash))
                        .bind((format!("w{i}_created_at"), session.created_at))
                        .bind((format!("w{i}_expires_at"), session.expires_at))
                        .bind((format!("w{i}_revoked_at"), session.revoked_at));
                }
                Write::RevokeSession { id, revoked_at } => {
                    builder = builder
                        .bind((format!("w{i}_id"), id.to_string()))
                        .bind((format!("w{i}_revoked_at"), revoked_at));
                }
            }
        }

        let mut response = builder.await.map_err(|e| classify(e.to_string()))?;

        // A failed transaction reports every statement as failed; look for
        // the one naming an index or guard before falling back.
        let errors: Vec<String> = response
            .take_errors()
            .into_values()
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            debug!("Unit of work committed");
            return Ok(());
        }
        let err = errors
            .iter()
            .map(|m| classify(m.clone()))
            .find(|e| {
                matches!(
                    e,
                    DbError::UniqueViolation { .. } | DbError::StaleWrite { .. }
                )
            })
            .unwrap_or_else(|| classify(errors.join("; ")));
        warn!(error = %err, "Unit of work rolled back");
        Err(err.into())
    }
}

/// SurrealQL for the `i`-th write; parameters are named `$w{i}_*`.
fn statement(i: usize, write: &Write) -> String {
    match write {
        Write::PutUser(_) => format!(
            "UPSERT type::record('user', $w{i}_id) SET \
             email = $w{i}_email, \
             created_at = $w{i}_created_at, \
             last_login_at = $w{i}_last_login_at, \
             is_active = $w{i}_is_active;\n"
        ),
        Write::PatchUser { patch, .. } => format!(
            "UPDATE type::record('user', $w{i}_id) SET {};\n",
            patch_assignments(i, patch).join(", ")
        ),
        Write::PutSession(_) => format!(
            "UPSERT type::record('session', $w{i}_id) SET \
             user_id = $w{i}_user_id, \
             token_hash = $w{i}_token_hash, \
             created_at = $w{i}_created_at, \
             expires_at = $w{i}_expires_at, \
             revoked_at = $w{i}_revoked_at;\n"
        ),
        Write::RevokeSession { .. } => format!(
            "LET $w{i}_hit = (UPDATE type::record('session', $w{i}_id) \
             SET revoked_at = $w{i}_revoked_at WHERE revoked_at IS NONE);\n\
             IF array::len($w{i}_hit) == 0 {{ THROW \"{STALE_REVOCATION}\" }};\n"
        ),
    }
}

fn patch_assignments(i: usize, patch: &UserPatch) -> Vec<String> {
    let mut sets = Vec::new();
    if patch.email.is_some() {
        sets.push(format!("email = $w{i}_email"));
    }
    if patch.last_login_at.is_some() {
        sets.push(format!("last_login_at = $w{i}_last_login_at"));
    }
    if patch.is_active.is_some() {
        sets.push(format!("is_active = $w{i}_is_active"));
    }
    sets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_statement_sets_only_changed_fields() {
        let write = Write::PatchUser {
            id: Uuid::new_v4(),
            patch: UserPatch {
                last_login_at: Some(None),
                ..UserPatch::default()
            },
        };
        let sql = statement(3, &write);
        assert!(sql.starts_with("UPDATE type::record('user', $w3_id)"));
        assert!(sql.contains("last_login_at = $w3_last_login_at"));
        assert!(!sql.contains("is_active"));
        assert!(!sql.contains("email"));
    }

    #[test]
    fn revocation_is_guarded() {
        let write = Write::RevokeSession {
            id: Uuid::new_v4(),
            revoked_at: Utc::now(),
        };
        let sql = statement(0, &write);
        assert!(sql.contains("WHERE revoked_at IS NONE"));
        assert!(sql.contains(STALE_REVOCATION));
    }

    #[test]
    fn thrown_guard_is_classified_as_stale_session() {
        let err = classify(format!("An error occurred: {STALE_REVOCATION}"));
        assert!(matches!(err, DbError::StaleWrite { entity } if entity == "session"));
    }
}
