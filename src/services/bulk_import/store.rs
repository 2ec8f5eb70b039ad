use std::fmt;

use async_trait::async_trait;
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;
use time::Date;

use crate::db::types::{ActivityType, RelationshipRole};

/// Column a unique constraint guards, derived from the constraint name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConflictField {
    NationalId,
    Email,
    Username,
    Phone,
    Activity,
    Other(String),
}

impl ConflictField {
    pub(crate) fn from_constraint(constraint: &str) -> Self {
        match constraint {
            "users_school_national_id_key" => Self::NationalId,
            "users_school_email_key" => Self::Email,
            "users_school_username_key" => Self::Username,
            "users_school_parent_phone_key" => Self::Phone,
            "educational_activities_natural_key" => Self::Activity,
            other => Self::Other(other.to_string()),
        }
    }

    fn column(&self) -> Option<&str> {
        match self {
            Self::NationalId => Some("national_id"),
            Self::Email => Some("email"),
            Self::Username => Some("username"),
            Self::Phone => Some("phone"),
            Self::Activity => Some("title"),
            Self::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniqueViolation {
    pub(crate) field: ConflictField,
    pub(crate) value: Option<String>,
}

impl fmt::Display for UniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{:?} = {value}", self.field),
            None => write!(f, "{:?}", self.field),
        }
    }
}

/// Persistence failures as the import pipeline sees them. Driver errors are
/// classified once, here, so callers never inspect driver text.
#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(UniqueViolation),
    #[error("database unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let field = ConflictField::from_constraint(db_err.constraint().unwrap_or_default());
                let value = db_err
                    .try_downcast_ref::<PgDatabaseError>()
                    .and_then(PgDatabaseError::detail)
                    .and_then(|detail| conflicting_value(detail, &field));
                Self::Conflict(UniqueViolation { field, value })
            }
            unavailable @ (sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)) => Self::Unavailable(unavailable.to_string()),
            other => Self::Database(other.to_string()),
        }
    }
}

/// Pulls the offending value out of a Postgres detail line such as
/// `Key (school_id, email)=(s-1, a@b.c) already exists.`
pub(crate) fn conflicting_value(detail: &str, field: &ConflictField) -> Option<String> {
    let rest = detail.strip_prefix("Key (")?;
    let (columns, rest) = rest.split_once(")=(")?;
    let values = rest.rsplit_once(") already exists")?.0;

    let columns: Vec<&str> = columns.split(", ").collect();
    let values: Vec<&str> = values.split(", ").collect();
    if columns.len() != values.len() {
        return None;
    }

    let pairs = columns.iter().zip(values.iter());
    let wanted = field.column();
    pairs
        .clone()
        .find(|(column, _)| Some(**column) == wanted)
        .or_else(|| pairs.filter(|(column, _)| **column != "school_id").last())
        .map(|(_, value)| value.to_string())
}

pub(crate) struct NewStudent<'a> {
    pub(crate) school_id: &'a str,
    pub(crate) national_id: &'a str,
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) email: Option<&'a str>,
    pub(crate) mobile: Option<&'a str>,
    pub(crate) birth_date: Option<Date>,
    pub(crate) hashed_password: &'a str,
}

pub(crate) struct StudentProfile<'a> {
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) email: Option<&'a str>,
    pub(crate) mobile: Option<&'a str>,
    pub(crate) birth_date: Option<Date>,
}

pub(crate) struct NewParent<'a> {
    pub(crate) school_id: &'a str,
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) mobile: &'a str,
    pub(crate) email: Option<&'a str>,
    pub(crate) hashed_password: &'a str,
}

pub(crate) struct NewActivity<'a> {
    pub(crate) school_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) class_id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) teacher_id: &'a str,
    pub(crate) activity_type: ActivityType,
    pub(crate) title: &'a str,
    pub(crate) date: Date,
    pub(crate) score: Option<f64>,
    pub(crate) qualitative_evaluation: Option<&'a str>,
    pub(crate) description: Option<&'a str>,
}

/// Source of per-row transactions.
#[async_trait]
pub(crate) trait ImportStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn ImportTx>, StoreError>;
}

/// One open transaction. Reads and writes are scoped to it until `commit`
/// or `rollback` consumes the handle.
#[async_trait]
pub(crate) trait ImportTx: Send {
    async fn find_student(
        &mut self,
        school_id: &str,
        national_id: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Id of any user in the school that owns `email`.
    async fn find_email_owner(
        &mut self,
        school_id: &str,
        email: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn insert_student(&mut self, student: NewStudent<'_>) -> Result<String, StoreError>;

    async fn update_student(
        &mut self,
        student_id: &str,
        profile: StudentProfile<'_>,
    ) -> Result<(), StoreError>;

    async fn ensure_class_membership(
        &mut self,
        class_id: &str,
        student_id: &str,
    ) -> Result<(), StoreError>;

    async fn find_parent_by_phone(
        &mut self,
        school_id: &str,
        mobile: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn find_parent_by_email(
        &mut self,
        school_id: &str,
        email: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn insert_parent(&mut self, parent: NewParent<'_>) -> Result<String, StoreError>;

    /// Last write wins on the name; `email` only overwrites when given.
    async fn update_parent(
        &mut self,
        parent_id: &str,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn upsert_parent_relation(
        &mut self,
        parent_id: &str,
        student_id: &str,
        relationship: RelationshipRole,
    ) -> Result<(), StoreError>;

    async fn find_class_student(
        &mut self,
        school_id: &str,
        class_id: &str,
        national_id: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn insert_activity(&mut self, activity: NewActivity<'_>) -> Result<String, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_field_from_constraint_name() {
        assert_eq!(ConflictField::from_constraint("users_school_email_key"), ConflictField::Email);
        assert_eq!(
            ConflictField::from_constraint("users_school_parent_phone_key"),
            ConflictField::Phone
        );
        assert_eq!(
            ConflictField::from_constraint("lessons_assignment_key"),
            ConflictField::Other("lessons_assignment_key".to_string())
        );
    }

    #[test]
    fn value_is_read_from_postgres_detail() {
        let detail = "Key (school_id, email)=(school-1, a@b.c) already exists.";
        assert_eq!(conflicting_value(detail, &ConflictField::Email).as_deref(), Some("a@b.c"));

        let detail = "Key (school_id, phone)=(school-1, 09121111111) already exists.";
        assert_eq!(
            conflicting_value(detail, &ConflictField::Phone).as_deref(),
            Some("09121111111")
        );
    }

    #[test]
    fn unknown_constraint_takes_last_non_tenant_value() {
        let detail = "Key (school_id, name)=(school-1, 7A) already exists.";
        let field = ConflictField::Other("classes_school_name_key".to_string());
        assert_eq!(conflicting_value(detail, &field).as_deref(), Some("7A"));
    }

    #[test]
    fn malformed_detail_yields_no_value() {
        assert_eq!(conflicting_value("duplicate", &ConflictField::Email), None);
        assert_eq!(
            conflicting_value("Key (a, b)=(only-one) already exists.", &ConflictField::Email),
            None
        );
    }

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(matches!(StoreError::from(sqlx::Error::PoolTimedOut), StoreError::Unavailable(_)));
        assert!(matches!(StoreError::from(sqlx::Error::RowNotFound), StoreError::Database(_)));
    }
}
