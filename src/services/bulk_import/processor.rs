use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;

use super::columns::{ColumnLayout, ACTIVITY_LAYOUT, STUDENT_LAYOUT};
use super::hasher::CredentialHasher;
use super::parser::ImportRow;
use super::store::{
    ConflictField, ImportStore, ImportTx, NewActivity, NewParent, NewStudent, StoreError,
    StudentProfile, UniqueViolation,
};
use super::unit_of_work::with_unit_of_work;
use super::validator::{ActivityRecord, RowValidator, StudentRecord, ValidationOutcome};
use crate::core::security::SecurityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutcomeKind {
    Created,
    Updated,
    Failed,
}

impl OutcomeKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Failed => "failed",
        }
    }
}

/// Result of one row, keyed by its source line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportOutcomeRecord {
    pub(crate) row: usize,
    pub(crate) kind: OutcomeKind,
    pub(crate) message: String,
}

impl ImportOutcomeRecord {
    pub(crate) fn line(&self) -> String {
        format!("ردیف {}: {}", self.row, self.message)
    }
}

/// Successful persistence of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Processed {
    pub(crate) kind: OutcomeKind,
    pub(crate) message: String,
}

#[derive(Debug, Error)]
pub(crate) enum RowError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("credential hashing failed: {0}")]
    Hashing(#[from] SecurityError),
    #[error("email {email} belongs to another user")]
    EmailTaken { email: String },
    #[error("student {national_id} is not a member of the class")]
    StudentNotInClass { national_id: String },
    #[error("guardian {mobile} resolves to a parent already linked in this row")]
    GuardianCollision { mobile: String },
}

impl RowError {
    /// User-facing text for the row's error line.
    pub(crate) fn localized(&self) -> String {
        match self {
            Self::Store(StoreError::Conflict(violation)) => conflict_message(violation),
            Self::Store(StoreError::Unavailable(_)) => {
                "ارتباط با پایگاه داده برقرار نشد".to_string()
            }
            Self::Store(StoreError::Database(_)) => "خطای پایگاه داده هنگام ذخیره ردیف".to_string(),
            Self::Hashing(_) => "ساخت رمز عبور پیش‌فرض ناموفق بود".to_string(),
            Self::EmailTaken { email } => format!("ایمیل «{email}» قبلا ثبت شده است"),
            Self::StudentNotInClass { national_id } => {
                format!("دانش‌آموزی با کد ملی «{national_id}» در این کلاس یافت نشد")
            }
            Self::GuardianCollision { mobile } => {
                format!("ولی با موبایل «{mobile}» با ولی دیگر همین ردیف یکی شده است")
            }
        }
    }

    /// Errors that mean no row can succeed, as opposed to a bad row.
    pub(crate) fn is_unavailable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unavailable(_)))
    }
}

fn conflict_message(violation: &UniqueViolation) -> String {
    let label = match &violation.field {
        ConflictField::NationalId => "کد ملی",
        ConflictField::Email => "ایمیل",
        ConflictField::Username => "نام کاربری",
        ConflictField::Phone => "شماره موبایل",
        ConflictField::Activity => return "این فعالیت قبلا برای دانش‌آموز ثبت شده است".to_string(),
        ConflictField::Other(_) => "مقدار",
    };
    match &violation.value {
        Some(value) => format!("{label} «{value}» قبلا ثبت شده است"),
        None => format!("{label} تکراری است"),
    }
}

/// One import flavor: its column layout, row validation, and the
/// transactional effect of a valid row.
#[async_trait]
pub(crate) trait ImportKind: Send + Sync {
    type Record: Send + 'static;

    fn name(&self) -> &'static str;

    fn layout(&self) -> &'static ColumnLayout;

    fn validate(&self, row: &ImportRow) -> ValidationOutcome<Self::Record>;

    async fn process(
        &self,
        store: &dyn ImportStore,
        record: Self::Record,
    ) -> Result<Processed, RowError>;
}

#[derive(Clone)]
pub(crate) struct StudentImport {
    school_id: String,
    class_id: Option<String>,
    validator: RowValidator,
    hasher: Arc<dyn CredentialHasher>,
}

impl StudentImport {
    pub(crate) fn new(
        school_id: String,
        class_id: Option<String>,
        validator: RowValidator,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self { school_id, class_id, validator, hasher }
    }
}

#[async_trait]
impl ImportKind for StudentImport {
    type Record = StudentRecord;

    fn name(&self) -> &'static str {
        STUDENT_LAYOUT.kind
    }

    fn layout(&self) -> &'static ColumnLayout {
        &STUDENT_LAYOUT
    }

    fn validate(&self, row: &ImportRow) -> ValidationOutcome<StudentRecord> {
        self.validator.validate_student(row)
    }

    async fn process(
        &self,
        store: &dyn ImportStore,
        record: StudentRecord,
    ) -> Result<Processed, RowError> {
        let ctx = self.clone();
        with_unit_of_work(store, move |tx| {
            async move { ctx.persist(tx, &record).await }.boxed()
        })
        .await
    }
}

impl StudentImport {
    async fn persist(
        &self,
        tx: &mut dyn ImportTx,
        record: &StudentRecord,
    ) -> Result<Processed, RowError> {
        let school_id = self.school_id.as_str();
        let name = format!("{} {}", record.first_name, record.last_name);

        let (student_id, kind) = match tx.find_student(school_id, &record.national_id).await? {
            Some(student_id) => {
                tx.update_student(
                    &student_id,
                    StudentProfile {
                        first_name: &record.first_name,
                        last_name: &record.last_name,
                        email: record.email.as_deref(),
                        mobile: record.mobile.as_deref(),
                        birth_date: record.birth_date,
                    },
                )
                .await?;
                (student_id, OutcomeKind::Updated)
            }
            None => {
                if let Some(email) = &record.email {
                    if tx.find_email_owner(school_id, email).await?.is_some() {
                        return Err(RowError::EmailTaken { email: email.clone() });
                    }
                }

                let hashed_password = self.hasher.hash(&record.national_id).await?;
                let student_id = tx
                    .insert_student(NewStudent {
                        school_id,
                        national_id: &record.national_id,
                        first_name: &record.first_name,
                        last_name: &record.last_name,
                        email: record.email.as_deref(),
                        mobile: record.mobile.as_deref(),
                        birth_date: record.birth_date,
                        hashed_password: &hashed_password,
                    })
                    .await?;
                (student_id, OutcomeKind::Created)
            }
        };

        if let Some(class_id) = &self.class_id {
            tx.ensure_class_membership(class_id, &student_id).await?;
        }

        let mut linked: Vec<String> = Vec::with_capacity(record.guardians.len());
        for guardian in &record.guardians {
            let existing = match tx.find_parent_by_phone(school_id, &guardian.mobile).await? {
                Some(parent_id) => Some(parent_id),
                None => match &guardian.email {
                    Some(email) => tx.find_parent_by_email(school_id, email).await?,
                    None => None,
                },
            };

            let parent_id = match existing {
                Some(parent_id) if linked.contains(&parent_id) => {
                    return Err(RowError::GuardianCollision { mobile: guardian.mobile.clone() });
                }
                Some(parent_id) => {
                    tx.update_parent(
                        &parent_id,
                        &guardian.first_name,
                        &guardian.last_name,
                        guardian.email.as_deref(),
                    )
                    .await?;
                    parent_id
                }
                None => {
                    let hashed_password = self.hasher.hash(&guardian.mobile).await?;
                    tx.insert_parent(NewParent {
                        school_id,
                        first_name: &guardian.first_name,
                        last_name: &guardian.last_name,
                        mobile: &guardian.mobile,
                        email: guardian.email.as_deref(),
                        hashed_password: &hashed_password,
                    })
                    .await?
                }
            };

            tx.upsert_parent_relation(&parent_id, &student_id, guardian.relationship).await?;
            tracing::debug!(
                parent_id = %parent_id,
                guardian = %guardian.full_name(),
                relationship = guardian.relationship.label(),
                "Guardian linked"
            );
            linked.push(parent_id);
        }

        let message = match kind {
            OutcomeKind::Updated => format!("دانش‌آموز {name} به‌روزرسانی شد"),
            _ => format!("دانش‌آموز {name} ثبت شد"),
        };
        Ok(Processed { kind, message })
    }
}

#[derive(Clone)]
pub(crate) struct ActivityImport {
    school_id: String,
    class_id: String,
    subject_id: String,
    teacher_id: String,
    validator: RowValidator,
}

impl ActivityImport {
    pub(crate) fn new(
        school_id: String,
        class_id: String,
        subject_id: String,
        teacher_id: String,
        validator: RowValidator,
    ) -> Self {
        Self { school_id, class_id, subject_id, teacher_id, validator }
    }

    async fn persist(
        &self,
        tx: &mut dyn ImportTx,
        record: &ActivityRecord,
    ) -> Result<Processed, RowError> {
        let student_id = tx
            .find_class_student(&self.school_id, &self.class_id, &record.national_id)
            .await?
            .ok_or_else(|| RowError::StudentNotInClass { national_id: record.national_id.clone() })?;

        tx.insert_activity(NewActivity {
            school_id: &self.school_id,
            student_id: &student_id,
            class_id: &self.class_id,
            subject_id: &self.subject_id,
            teacher_id: &self.teacher_id,
            activity_type: record.activity_type,
            title: &record.title,
            date: record.date,
            score: record.score,
            qualitative_evaluation: record.qualitative_evaluation.as_deref(),
            description: record.description.as_deref(),
        })
        .await?;

        Ok(Processed {
            kind: OutcomeKind::Created,
            message: format!(
                "{} «{}» برای کد ملی {} در تاریخ {} ثبت شد",
                record.activity_type.label(),
                record.title,
                record.national_id,
                record.jalali_date
            ),
        })
    }
}

#[async_trait]
impl ImportKind for ActivityImport {
    type Record = ActivityRecord;

    fn name(&self) -> &'static str {
        ACTIVITY_LAYOUT.kind
    }

    fn layout(&self) -> &'static ColumnLayout {
        &ACTIVITY_LAYOUT
    }

    fn validate(&self, row: &ImportRow) -> ValidationOutcome<ActivityRecord> {
        self.validator.validate_activity(row)
    }

    async fn process(
        &self,
        store: &dyn ImportStore,
        record: ActivityRecord,
    ) -> Result<Processed, RowError> {
        let ctx = self.clone();
        with_unit_of_work(store, move |tx| {
            async move { ctx.persist(tx, &record).await }.boxed()
        })
        .await
    }
}
