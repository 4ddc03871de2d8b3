//! Integration tests for the SurrealDB auth store using in-memory SurrealDB.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tessera_auth::{AuthConfig, AuthError, AuthService, FixedClock, token};
use tessera_core::error::CoreError;
use tessera_core::models::{session::Session, user::User};
use tessera_core::repository::{AuthRepository, AuthStore, UnitOfWork};
use tessera_db::SurrealAuthStore;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// Spin up in-memory DB and run migrations.
async fn setup() -> SurrealAuthStore<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tessera_db::run_migrations(&db).await.unwrap();
    SurrealAuthStore::new(db)
}

fn service() -> (AuthService, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(t0()));
    (
        AuthService::with_clock(AuthConfig::default(), clock.clone()),
        clock,
    )
}

#[tokio::test]
async fn committed_user_and_session_round_trip() {
    let store = setup().await;
    let user = User {
        last_login_at: Some(t0()),
        ..User::new("alice@example.com".into(), t0())
    };
    let session = Session::new(user.id, "abc123hash".into(), t0(), Duration::days(7));

    let uow = store.begin();
    uow.add_user(&user).await.unwrap();
    uow.flush().await.unwrap();
    uow.add_session(&session).await.unwrap();
    uow.commit().await.unwrap();

    let reader = store.begin();
    assert_eq!(
        reader.find_user_by_email("alice@example.com").await.unwrap(),
        Some(user.clone())
    );
    assert_eq!(reader.find_user_by_id(user.id).await.unwrap(), Some(user));
    assert_eq!(
        reader.find_session_by_token_hash("abc123hash").await.unwrap(),
        Some(session)
    );
}

#[tokio::test]
async fn lookups_miss_cleanly() {
    let store = setup().await;
    let reader = store.begin();

    assert!(reader.find_user_by_email("nobody@example.com").await.unwrap().is_none());
    assert!(reader.find_user_by_id(uuid::Uuid::new_v4()).await.unwrap().is_none());
    assert!(reader.find_session_by_token_hash("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn dropped_unit_of_work_writes_nothing() {
    let store = setup().await;
    let user = User::new("ghost@example.com".into(), t0());

    let uow = store.begin();
    uow.add_user(&user).await.unwrap();
    uow.flush().await.unwrap();
    assert!(uow.find_user_by_id(user.id).await.unwrap().is_some());
    drop(uow);

    let reader = store.begin();
    assert!(reader.find_user_by_id(user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_commit_is_conflict() {
    let store = setup().await;

    let first = store.begin();
    let second = store.begin();
    first
        .add_user(&User::new("dup@example.com".into(), t0()))
        .await
        .unwrap();
    second
        .add_user(&User::new("dup@example.com".into(), t0()))
        .await
        .unwrap();

    first.commit().await.unwrap();
    let err = second.commit().await.unwrap_err();
    assert!(
        matches!(&err, CoreError::AlreadyExists { entity } if entity == "user"),
        "expected AlreadyExists, got: {err:?}"
    );
}

#[tokio::test]
async fn register_login_logout_over_surreal() {
    let store = setup().await;
    let (svc, clock) = service();

    let uow = store.begin();
    let registered = svc.register_user(&uow, "New@Example.com").await.unwrap();
    uow.commit().await.unwrap();
    assert_eq!(registered.user.email, "new@example.com");

    clock.advance(Duration::hours(1));
    let uow = store.begin();
    let login = svc.login_user(&uow, "new@example.com").await.unwrap();
    uow.commit().await.unwrap();

    let uow = store.begin();
    let user = svc.get_user_for_session(&uow, &login.token).await.unwrap();
    assert_eq!(user.id, registered.user.id);
    assert_eq!(user.last_login_at, Some(t0() + Duration::hours(1)));

    let uow = store.begin();
    svc.logout_session(&uow, &login.token).await.unwrap();
    uow.commit().await.unwrap();

    let uow = store.begin();
    let err = svc.get_user_for_session(&uow, &login.token).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionRevoked));

    // The registration session is unaffected by the other logout.
    let user = svc
        .get_user_for_session(&uow, &registered.token)
        .await
        .unwrap();
    assert_eq!(user.email, "new@example.com");

    let stored = uow
        .find_session_by_token_hash(&token::hash_token(&login.token))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.revoked_at, Some(t0() + Duration::hours(1)));
}

#[tokio::test]
async fn concurrent_registration_is_serialized_by_index() {
    let store = setup().await;
    let (svc, _clock) = service();

    let a = store.begin();
    let b = store.begin();
    // Both pass the existence check before either commits.
    let grant_a = svc.register_user(&a, "race@example.com").await;
    let grant_b = svc.register_user(&b, "race@example.com").await;
    assert!(grant_a.is_ok() && grant_b.is_ok());

    a.commit().await.unwrap();
    let err: AuthError = b.commit().await.unwrap_err().into();
    assert!(matches!(err, AuthError::UserAlreadyExists));

    let reader = store.begin();
    let winner = reader
        .find_user_by_email("race@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(winner.id, grant_a.unwrap().user.id);
    // The losing transaction's session was rolled back with it.
    let losing = grant_b.unwrap();
    assert!(
        reader
            .find_session_by_token_hash(&losing.session.token_hash)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn login_commit_keeps_concurrent_deactivation() {
    let store = setup().await;
    let (svc, clock) = service();

    let uow = store.begin();
    let registered = svc.register_user(&uow, "kept@example.com").await.unwrap();
    uow.commit().await.unwrap();

    clock.advance(Duration::hours(1));
    let login = store.begin();
    svc.login_user(&login, "kept@example.com").await.unwrap();

    let admin = store.begin();
    let mut user = admin
        .find_user_by_id(registered.user.id)
        .await
        .unwrap()
        .unwrap();
    user.is_active = false;
    admin.add_user(&user).await.unwrap();
    admin.commit().await.unwrap();

    login.commit().await.unwrap();

    let stored = store
        .begin()
        .find_user_by_id(registered.user.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.is_active, "login must not reactivate the user");
    assert_eq!(stored.last_login_at, Some(t0() + Duration::hours(1)));
}

#[tokio::test]
async fn concurrent_logouts_revoke_exactly_once() {
    let store = setup().await;
    let (svc, clock) = service();

    let uow = store.begin();
    let grant = svc.register_user(&uow, "twice@example.com").await.unwrap();
    uow.commit().await.unwrap();

    clock.advance(Duration::minutes(1));
    let first = store.begin();
    svc.logout_session(&first, &grant.token).await.unwrap();
    clock.advance(Duration::minutes(1));
    let second = store.begin();
    svc.logout_session(&second, &grant.token).await.unwrap();

    first.commit().await.unwrap();
    let err: AuthError = second.commit().await.unwrap_err().into();
    assert!(matches!(err, AuthError::SessionRevoked), "got {err:?}");

    let stored = store
        .begin()
        .find_session_by_token_hash(&grant.session.token_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.revoked_at, Some(t0() + Duration::minutes(1)));
}
