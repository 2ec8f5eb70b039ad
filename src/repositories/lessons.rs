use sqlx::PgPool;

pub(crate) async fn is_assigned(
    pool: &PgPool,
    teacher_id: &str,
    class_id: &str,
    subject_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM lessons
            WHERE teacher_id = $1 AND class_id = $2 AND subject_id = $3
         )",
    )
    .bind(teacher_id)
    .bind(class_id)
    .bind(subject_id)
    .fetch_one(pool)
    .await
}
