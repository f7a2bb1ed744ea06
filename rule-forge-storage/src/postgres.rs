//! PostgreSQL storage backend
//!
//! Row structs stay private to this module and convert into the core
//! models, keeping the core crate free of persistence concerns.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use rule_forge_core::{Rule, User};

use crate::{RuleStore, StorageError, UserStore};

const RULE_COLUMNS: &str =
    "id, user_id, name, source_code, wasm_binary, is_active, created_at, updated_at";
const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct RuleRow {
    id: i64,
    user_id: i64,
    name: String,
    source_code: String,
    wasm_binary: Vec<u8>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RuleRow> for Rule {
    fn from(row: RuleRow) -> Self {
        Rule {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            source_code: row.source_code,
            wasm_binary: row.wasm_binary,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: Option<String>,
    password_hash: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Open the connection pool. Failure here is fatal at startup.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        info!("running database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT,
                password_hash TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_keys (
                api_key TEXT PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rules (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                source_code TEXT NOT NULL,
                wasm_binary BYTEA NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (user_id, name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("database migrations complete");
        Ok(())
    }
}

#[async_trait]
impl RuleStore for PgStorage {
    async fn upsert_rule(
        &self,
        user_id: i64,
        name: &str,
        source_code: &str,
        wasm_binary: &[u8],
    ) -> Result<Rule, StorageError> {
        // Both timestamps come from the same now() on insert, so a
        // freshly created row compares created_at == updated_at exactly.
        let sql = format!(
            r#"
            INSERT INTO rules (user_id, name, source_code, wasm_binary, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, now(), now())
            ON CONFLICT (user_id, name) DO UPDATE
                SET source_code = EXCLUDED.source_code,
                    wasm_binary = EXCLUDED.wasm_binary,
                    is_active = TRUE,
                    updated_at = now()
            RETURNING {RULE_COLUMNS}
            "#
        );

        let row: RuleRow = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(name)
            .bind(source_code)
            .bind(wasm_binary)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn get_rule(&self, user_id: i64, name: &str) -> Result<Option<Rule>, StorageError> {
        let sql =
            format!("SELECT {RULE_COLUMNS} FROM rules WHERE user_id = $1 AND name = $2");
        let row: Option<RuleRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Rule::from))
    }

    async fn list_rules(&self, user_id: i64) -> Result<Vec<Rule>, StorageError> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM rules \
             WHERE user_id = $1 AND is_active ORDER BY created_at DESC"
        );
        let rows: Vec<RuleRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Rule::from).collect())
    }

    async fn delete_rule(&self, user_id: i64, name: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM rules WHERE user_id = $1 AND name = $2")
            .bind(user_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "rule '{name}' not found for user {user_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStorage {
    async fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
        password_hash: &str,
    ) -> Result<User, StorageError> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password_hash, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, TRUE, now(), now())
            RETURNING {USER_COLUMNS}
            "#
        );

        let row: Result<UserRow, sqlx::Error> = sqlx::query_as(&sql)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await;

        match row {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                StorageError::AlreadyExists(format!("username '{username}' is taken")),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_active"
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn create_api_key(&self, api_key: &str, user_id: i64) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO api_keys (api_key, user_id, is_active) VALUES ($1, $2, TRUE)")
            .bind(api_key)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn user_id_for_api_key(&self, api_key: &str) -> Result<Option<i64>, StorageError> {
        let user_id: Option<i64> =
            sqlx::query_scalar("SELECT user_id FROM api_keys WHERE api_key = $1 AND is_active")
                .bind(api_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user_id)
    }
}
