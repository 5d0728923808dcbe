use crate::loyalty::error::LoyaltyError;
use crate::loyalty::model::{RawUserProfile, UserProfile};
use sqlx::PgPool;
use uuid::Uuid;

/// The profile lives as one jsonb document per member. `version`
/// guards every read-modify-write against concurrent sessions of the
/// same account.
pub async fn fetch(
    db: &PgPool,
    member_id: Uuid,
) -> Result<Option<(RawUserProfile, i64)>, LoyaltyError> {
    let row = sqlx::query_as::<_, (serde_json::Value, i64)>(
        r#"
        SELECT doc, version
        FROM member_profiles
        WHERE member_id = $1
        "#,
    )
    .bind(member_id)
    .fetch_optional(db)
    .await?;

    match row {
        Some((doc, version)) => Ok(Some((serde_json::from_value(doc)?, version))),
        None => Ok(None),
    }
}

pub async fn insert(
    db: &PgPool,
    member_id: Uuid,
    profile: &UserProfile,
) -> Result<(), LoyaltyError> {
    sqlx::query(
        r#"
        INSERT INTO member_profiles (member_id, doc, version)
        VALUES ($1, $2, 1)
        ON CONFLICT (member_id) DO NOTHING
        "#,
    )
    .bind(member_id)
    .bind(serde_json::to_value(profile)?)
    .execute(db)
    .await?;
    Ok(())
}

/// Conditional write: succeeds only if nobody bumped `version` since
/// our read. Returns false on a version mismatch.
pub async fn update_guarded(
    db: &PgPool,
    member_id: Uuid,
    profile: &UserProfile,
    expected_version: i64,
) -> Result<bool, LoyaltyError> {
    let result = sqlx::query(
        r#"
        UPDATE member_profiles
        SET doc = $3, version = version + 1, updated_at = now()
        WHERE member_id = $1 AND version = $2
        "#,
    )
    .bind(member_id)
    .bind(expected_version)
    .bind(serde_json::to_value(profile)?)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Full account reset: drop the document. A fresh one is bootstrapped
/// on the next profile access.
pub async fn delete(db: &PgPool, member_id: Uuid) -> Result<(), LoyaltyError> {
    sqlx::query(
        r#"
        DELETE FROM member_profiles
        WHERE member_id = $1
        "#,
    )
    .bind(member_id)
    .execute(db)
    .await?;
    Ok(())
}
