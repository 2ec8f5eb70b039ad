use time::PrimitiveDateTime;

use crate::db::models::School;

pub(crate) async fn find_by_name(
    executor: impl sqlx::PgExecutor<'_>,
    name: &str,
) -> Result<Option<School>, sqlx::Error> {
    sqlx::query_as::<_, School>("SELECT id, name, created_at FROM schools WHERE name = $1")
        .bind(name)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    name: &str,
    created_at: PrimitiveDateTime,
) -> Result<School, sqlx::Error> {
    sqlx::query_as::<_, School>(
        "INSERT INTO schools (id, name, created_at) VALUES ($1,$2,$3)
         RETURNING id, name, created_at",
    )
    .bind(id)
    .bind(name)
    .bind(created_at)
    .fetch_one(executor)
    .await
}
