/// Session scope tests
///
/// Commit-on-success, rollback-on-failure, close-always behavior of the
/// session scope, observed through durable state on a file-backed engine.
/// Run with: cargo test --test session_scope_tests
use sqlbridge::{
    Bridge, DbError, Engine, EngineConfig, Parent, Session, SessionState, engine, schema,
    with_session,
};
use tempfile::TempDir;

fn file_engine(dir: &TempDir) -> Engine {
    let url = format!("sqlite://{}", dir.path().join("scope.db").display());
    let db = Engine::new(EngineConfig::from_url(&url).unwrap());
    db.on_connect(engine::enable_foreign_keys).unwrap();
    db
}

async fn reset_schema(bridge: &Bridge, db: &Engine) {
    let db = db.clone();
    bridge
        .dispatch(move || {
            let conn = db.connect()?;
            schema::drop_all(&conn)?;
            schema::create_all(&conn)
        })
        .await
        .unwrap();
}

async fn count_parents(bridge: &Bridge, db: &Engine) -> i64 {
    let db = db.clone();
    bridge
        .dispatch(move || {
            let conn = db.connect()?;
            let count = conn.query_row("SELECT count(*) FROM parent", [], |row| row.get(0))?;
            Ok(count)
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_successful_scope_commits() {
    let dir = TempDir::new().unwrap();
    let db = file_engine(&dir);
    let bridge = Bridge::current();
    reset_schema(&bridge, &db).await;

    with_session(&bridge, &db, |session| {
        Box::pin(async move { session.add_all(vec![Parent::with_children(2)]).await })
    })
    .await
    .unwrap();

    assert_eq!(count_parents(&bridge, &db).await, 1);
}

#[tokio::test]
async fn test_failing_scope_rolls_back_and_reraises() {
    let dir = TempDir::new().unwrap();
    let db = file_engine(&dir);
    let bridge = Bridge::current();
    reset_schema(&bridge, &db).await;

    let outcome: sqlbridge::Result<()> = with_session(&bridge, &db, |session| {
        Box::pin(async move {
            session.add_all(vec![Parent::new()]).await?;
            Err(DbError::InvalidUrl("scope failure".into()))
        })
    })
    .await;

    // The body's own failure comes back, type and message intact.
    match outcome.unwrap_err() {
        DbError::InvalidUrl(msg) => assert_eq!(msg, "scope failure"),
        other => panic!("expected the body's error, got {other:?}"),
    }

    // And nothing from the failed scope is durable.
    assert_eq!(count_parents(&bridge, &db).await, 0);
}

#[tokio::test]
async fn test_scope_value_passes_through() {
    let dir = TempDir::new().unwrap();
    let db = file_engine(&dir);
    let bridge = Bridge::current();
    reset_schema(&bridge, &db).await;

    with_session(&bridge, &db, |session| {
        Box::pin(async move { session.add_all(vec![Parent::new(), Parent::new()]).await })
    })
    .await
    .unwrap();

    let parents = with_session(&bridge, &db, |session| {
        Box::pin(async move { session.parents().await })
    })
    .await
    .unwrap();
    assert_eq!(parents.len(), 2);
}

#[tokio::test]
async fn test_manual_session_commit_is_exactly_once() {
    let dir = TempDir::new().unwrap();
    let db = file_engine(&dir);
    let bridge = Bridge::current();
    reset_schema(&bridge, &db).await;

    let mut session = Session::open(&bridge, &db).await.unwrap();
    session.add_all(vec![Parent::new()]).await.unwrap();

    session.commit().await.unwrap();
    assert_eq!(session.state(), SessionState::Committed);

    // A second commit (or a late rollback) is a structural error.
    assert!(matches!(
        session.commit().await.unwrap_err(),
        DbError::Session(_)
    ));
    assert!(matches!(
        session.rollback().await.unwrap_err(),
        DbError::Session(_)
    ));

    session.close().await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);
    assert!(matches!(
        session.close().await.unwrap_err(),
        DbError::Session(_)
    ));

    assert_eq!(count_parents(&bridge, &db).await, 1);
}

#[tokio::test]
async fn test_explicit_rollback_discards_changes() {
    let dir = TempDir::new().unwrap();
    let db = file_engine(&dir);
    let bridge = Bridge::current();
    reset_schema(&bridge, &db).await;

    let mut session = Session::open(&bridge, &db).await.unwrap();
    session.add_all(vec![Parent::new()]).await.unwrap();
    session.rollback().await.unwrap();
    session.close().await.unwrap();

    assert_eq!(count_parents(&bridge, &db).await, 0);
}

#[tokio::test]
async fn test_dropped_session_rolls_back() {
    let dir = TempDir::new().unwrap();
    let db = file_engine(&dir);
    let bridge = Bridge::current();
    reset_schema(&bridge, &db).await;

    {
        let mut session = Session::open(&bridge, &db).await.unwrap();
        session.add_all(vec![Parent::new()]).await.unwrap();
        // Dropped without commit.
    }

    assert_eq!(count_parents(&bridge, &db).await, 0);
}

#[tokio::test]
async fn test_engine_stays_usable_after_failed_scope() {
    let dir = TempDir::new().unwrap();
    let db = file_engine(&dir);
    let bridge = Bridge::current();
    reset_schema(&bridge, &db).await;

    let failed: sqlbridge::Result<()> = with_session(&bridge, &db, |_session| {
        Box::pin(async move { Err(DbError::Session("induced".into())) })
    })
    .await;
    assert!(failed.is_err());

    // The failed scope closed its connection; a fresh scope works.
    with_session(&bridge, &db, |session| {
        Box::pin(async move { session.add_all(vec![Parent::new()]).await })
    })
    .await
    .unwrap();
    assert_eq!(count_parents(&bridge, &db).await, 1);
}
