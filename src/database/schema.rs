//! First-run DDL. Every statement is idempotent so startup can run it unconditionally.

use sqlx::PgPool;
use tracing::info;

use super::manager::DatabaseError;

const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        username TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        is_admin BOOLEAN NOT NULL DEFAULT FALSE,
        email TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS users_data (
        id BIGSERIAL PRIMARY KEY,
        batch_id UUID NOT NULL,
        uploaded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        organization TEXT NOT NULL
    )"#,
    // Older deployments stored sha256 hex digests in `users.password` and left
    // `is_admin` nullable; bring such a table up to the current shape.
    r#"DO $$
    BEGIN
        IF EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = 'users' AND column_name = 'password'
        ) AND NOT EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = 'users' AND column_name = 'password_hash'
        ) THEN
            ALTER TABLE users RENAME COLUMN password TO password_hash;
        END IF;
    END $$"#,
    "ALTER TABLE users ADD COLUMN IF NOT EXISTS email TEXT",
    "ALTER TABLE users ADD COLUMN IF NOT EXISTS created_at TIMESTAMPTZ NOT NULL DEFAULT now()",
    "UPDATE users SET is_admin = FALSE WHERE is_admin IS NULL",
    "ALTER TABLE users ALTER COLUMN is_admin SET DEFAULT FALSE",
    "ALTER TABLE users ALTER COLUMN is_admin SET NOT NULL",
    "CREATE INDEX IF NOT EXISTS users_data_organization_idx ON users_data (organization)",
    "CREATE INDEX IF NOT EXISTS users_data_batch_idx ON users_data (batch_id)",
    r#"CREATE TABLE IF NOT EXISTS users_data_columns (
        name TEXT PRIMARY KEY,
        label TEXT NOT NULL,
        position BIGSERIAL,
        added_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS upload_batches (
        id UUID PRIMARY KEY,
        uploaded_by TEXT NOT NULL,
        file_name TEXT,
        row_count BIGINT NOT NULL,
        new_columns INTEGER NOT NULL DEFAULT 0,
        uploaded_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
];

/// Create the tables this service owns if they are missing.
pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!("Database schema is up to date");
    Ok(())
}
