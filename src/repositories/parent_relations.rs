use time::PrimitiveDateTime;

use crate::db::types::RelationshipRole;

/// Links a parent to a student; a repeated link takes the latest relationship.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    parent_id: &str,
    student_id: &str,
    relationship: RelationshipRole,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO parent_student_relations (parent_id, student_id, relationship, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$4)
         ON CONFLICT (parent_id, student_id)
         DO UPDATE SET relationship = excluded.relationship, updated_at = excluded.updated_at",
    )
    .bind(parent_id)
    .bind(student_id)
    .bind(relationship)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}
