use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub id: i64,
    pub username: String,
    pub token: String,
}

/// 用户维度统计：自己问卷收到的响应总数和已生成的 AI 洞察数
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_responses: i64,
    pub ai_insights_generated: i64,
}

impl User {
    pub async fn create(
        pool: &PgPool,
        username: &str,
        password_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash)
             VALUES ($1, $2)
             RETURNING id, username, password_hash",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT id, username, password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    pub async fn stats(pool: &PgPool, user_id: i64) -> Result<UserStats, sqlx::Error> {
        let total_responses = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM responses
             WHERE survey_id IN (SELECT id FROM surveys WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        let ai_insights_generated = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM analyses
             WHERE survey_id IN (SELECT id FROM surveys WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(UserStats {
            total_responses,
            ai_insights_generated,
        })
    }
}
