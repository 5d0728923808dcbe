use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Member account record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub created_at: OffsetDateTime,
}

impl Member {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, name, phone_number, email, password_hash, created_at
            FROM members
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(member)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, name, phone_number, email, password_hash, created_at
            FROM members
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(member)
    }

    /// Create a new member with hashed password.
    pub async fn create(
        db: &PgPool,
        name: &str,
        phone_number: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Member> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (name, phone_number, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, phone_number, email, password_hash, created_at
            "#,
        )
        .bind(name)
        .bind(phone_number)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(member)
    }
}
