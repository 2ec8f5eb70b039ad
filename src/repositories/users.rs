use sqlx::PgPool;
use time::{Date, PrimitiveDateTime};

use crate::db::models::User;
use crate::db::types::UserRole;

const COLUMNS: &str = "\
    id, school_id, role, username, national_id, first_name, last_name, email, phone, \
    birth_date, hashed_password, is_active, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_school_username(
    executor: impl sqlx::PgExecutor<'_>,
    school_id: &str,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE school_id = $1 AND username = $2"
    ))
    .bind(school_id)
    .bind(username)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_id_by_national_id(
    executor: impl sqlx::PgExecutor<'_>,
    school_id: &str,
    role: UserRole,
    national_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM users WHERE school_id = $1 AND role = $2 AND national_id = $3",
    )
    .bind(school_id)
    .bind(role)
    .bind(national_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_id_by_email(
    executor: impl sqlx::PgExecutor<'_>,
    school_id: &str,
    email: &str,
    role: Option<UserRole>,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM users
         WHERE school_id = $1 AND email = $2 AND ($3::userrole IS NULL OR role = $3)",
    )
    .bind(school_id)
    .bind(email)
    .bind(role)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_parent_id_by_phone(
    executor: impl sqlx::PgExecutor<'_>,
    school_id: &str,
    phone: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM users WHERE school_id = $1 AND role = 'parent' AND phone = $2",
    )
    .bind(school_id)
    .bind(phone)
    .fetch_optional(executor)
    .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) school_id: &'a str,
    pub(crate) role: UserRole,
    pub(crate) username: &'a str,
    pub(crate) national_id: Option<&'a str>,
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) email: Option<&'a str>,
    pub(crate) phone: Option<&'a str>,
    pub(crate) birth_date: Option<Date>,
    pub(crate) hashed_password: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, school_id, role, username, national_id, first_name, last_name, email, phone,
            birth_date, hashed_password, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,TRUE,$12,$12)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.role)
    .bind(params.username)
    .bind(params.national_id)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.email)
    .bind(params.phone)
    .bind(params.birth_date)
    .bind(params.hashed_password)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateProfile<'a> {
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) email: Option<&'a str>,
    pub(crate) phone: Option<&'a str>,
    pub(crate) birth_date: Option<Date>,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Overwrites the profile fields of a student; empty cells clear the stored value.
pub(crate) async fn update_profile(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateProfile<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET
            first_name = $1,
            last_name = $2,
            email = $3,
            phone = $4,
            birth_date = $5,
            updated_at = $6
         WHERE id = $7",
    )
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.email)
    .bind(params.phone)
    .bind(params.birth_date)
    .bind(params.updated_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Renames a parent; an absent email keeps the stored one.
pub(crate) async fn update_contact(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    first_name: &str,
    last_name: &str,
    email: Option<&str>,
    updated_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET
            first_name = $1,
            last_name = $2,
            email = COALESCE($3, email),
            updated_at = $4
         WHERE id = $5",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(updated_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn reset_credentials(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    role: UserRole,
    hashed_password: &str,
    updated_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET role = $1, hashed_password = $2, is_active = TRUE, updated_at = $3
         WHERE id = $4",
    )
    .bind(role)
    .bind(hashed_password)
    .bind(updated_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}
