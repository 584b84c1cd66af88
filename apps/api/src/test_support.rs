//! Shared fixtures for tests that run against a real PostgreSQL.
//!
//! Point `TEST_DATABASE_URL` at a disposable database. Every fixture runs the
//! embedded migrations and truncates all tables, so tests holding the lock
//! start from an empty schema. Without the variable these tests log and
//! return early.

use once_cell::sync::Lazy;
use sqlx::PgPool;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::db::create_pool;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// A migrated, empty database held exclusively until dropped.
pub struct TestDb {
    pub pool: PgPool,
    _lock: MutexGuard<'static, ()>,
}

pub async fn test_db() -> Option<TestDb> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL is not set; skipping database test");
        return None;
    };

    let lock = DB_LOCK.lock().await;
    let pool = create_pool(&database_url)
        .await
        .expect("failed to prepare TEST_DATABASE_URL");
    sqlx::query("TRUNCATE history_items, users CASCADE")
        .execute(&pool)
        .await
        .expect("failed to truncate test tables");

    Some(TestDb { pool, _lock: lock })
}

/// Inserts a bare account and returns its id.
pub async fn insert_user(pool: &PgPool, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, 'unused')")
        .bind(id)
        .bind(email)
        .execute(pool)
        .await
        .expect("failed to insert test user");
    id
}
