//! Demo: seed a Parent/Child graph through one session scope, then read it
//! back from concurrent tasks, with every storage call bridged off the
//! event loop.

use anyhow::Context;
use log::info;

use sqlbridge::{Bridge, Engine, EngineConfig, Parent, engine, schema, with_session};

const DB_URL: &str = "sqlite://sa.db";
const PARENTS: usize = 100;
const CHILDREN_PER_PARENT: usize = 100;
const QUERY_TASKS: usize = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let db = Engine::new(EngineConfig::from_url(DB_URL)?);
    db.on_connect(engine::enable_foreign_keys)?;
    let bridge = Bridge::current();

    // Start from an empty schema every run.
    let setup = db.clone();
    bridge
        .dispatch(move || {
            let conn = setup.connect()?;
            schema::drop_all(&conn)?;
            schema::create_all(&conn)
        })
        .await
        .context("schema reset failed")?;

    // Seed the whole graph in one commit-or-rollback scope.
    let parents: Vec<Parent> = (0..PARENTS)
        .map(|_| Parent::with_children(CHILDREN_PER_PARENT))
        .collect();
    with_session(&bridge, &db, move |session| {
        Box::pin(async move { session.add_all(parents).await })
    })
    .await
    .context("seeding failed")?;
    info!(
        "seeded {} parents with {} children each",
        PARENTS, CHILDREN_PER_PARENT
    );

    // Seeding is committed; now read it back from concurrent tasks, each
    // with its own session.
    let mut tasks = Vec::with_capacity(QUERY_TASKS);
    for task_id in 0..QUERY_TASKS {
        let bridge = bridge.clone();
        let db = db.clone();
        tasks.push(tokio::spawn(async move {
            let parents = with_session(&bridge, &db, |session| {
                Box::pin(async move { session.parents().await })
            })
            .await?;
            info!("task {task_id}: fetched {} parents", parents.len());
            sqlbridge::Result::Ok(parents.len())
        }));
    }

    for task in tasks {
        let fetched = task.await.context("query task panicked")??;
        println!("fetched {fetched} parents");
    }

    Ok(())
}
