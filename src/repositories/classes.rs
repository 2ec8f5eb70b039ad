use time::PrimitiveDateTime;

use crate::db::models::Class;

pub(crate) async fn find_in_school(
    executor: impl sqlx::PgExecutor<'_>,
    school_id: &str,
    class_id: &str,
) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(
        "SELECT id, school_id, name, grade_level, created_at
         FROM classes
         WHERE id = $1 AND school_id = $2",
    )
    .bind(class_id)
    .bind(school_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn ensure_membership(
    executor: impl sqlx::PgExecutor<'_>,
    class_id: &str,
    student_id: &str,
    joined_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO class_memberships (class_id, student_id, joined_at)
         VALUES ($1,$2,$3)
         ON CONFLICT (class_id, student_id) DO NOTHING",
    )
    .bind(class_id)
    .bind(student_id)
    .bind(joined_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Student id for a national ID, only when that student sits in the class.
pub(crate) async fn find_member_by_national_id(
    executor: impl sqlx::PgExecutor<'_>,
    school_id: &str,
    class_id: &str,
    national_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT u.id
         FROM users u
         JOIN class_memberships cm ON cm.student_id = u.id
         WHERE u.school_id = $1
           AND cm.class_id = $2
           AND u.national_id = $3
           AND u.role = 'student'",
    )
    .bind(school_id)
    .bind(class_id)
    .bind(national_id)
    .fetch_optional(executor)
    .await
}
