use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::store::{
    ImportStore, ImportTx, NewActivity, NewParent, NewStudent, StoreError, StudentProfile,
};
use crate::core::time::primitive_now_utc;
use crate::db::types::{RelationshipRole, UserRole};
use crate::repositories;

/// `ImportStore` over the shared connection pool. Each `begin` checks out a
/// connection that is returned when the transaction ends.
#[derive(Clone)]
pub(crate) struct PgImportStore {
    pool: PgPool,
}

impl PgImportStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportStore for PgImportStore {
    async fn begin(&self) -> Result<Box<dyn ImportTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgImportTx { tx }))
    }
}

struct PgImportTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ImportTx for PgImportTx {
    async fn find_student(
        &mut self,
        school_id: &str,
        national_id: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(repositories::users::find_id_by_national_id(
            &mut *self.tx,
            school_id,
            UserRole::Student,
            national_id,
        )
        .await?)
    }

    async fn find_email_owner(
        &mut self,
        school_id: &str,
        email: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(repositories::users::find_id_by_email(&mut *self.tx, school_id, email, None).await?)
    }

    async fn insert_student(&mut self, student: NewStudent<'_>) -> Result<String, StoreError> {
        let user = repositories::users::create(
            &mut *self.tx,
            repositories::users::CreateUser {
                id: &Uuid::new_v4().to_string(),
                school_id: student.school_id,
                role: UserRole::Student,
                username: student.national_id,
                national_id: Some(student.national_id),
                first_name: student.first_name,
                last_name: student.last_name,
                email: student.email,
                phone: student.mobile,
                birth_date: student.birth_date,
                hashed_password: student.hashed_password,
                now: primitive_now_utc(),
            },
        )
        .await?;
        Ok(user.id)
    }

    async fn update_student(
        &mut self,
        student_id: &str,
        profile: StudentProfile<'_>,
    ) -> Result<(), StoreError> {
        repositories::users::update_profile(
            &mut *self.tx,
            student_id,
            repositories::users::UpdateProfile {
                first_name: profile.first_name,
                last_name: profile.last_name,
                email: profile.email,
                phone: profile.mobile,
                birth_date: profile.birth_date,
                updated_at: primitive_now_utc(),
            },
        )
        .await?;
        Ok(())
    }

    async fn ensure_class_membership(
        &mut self,
        class_id: &str,
        student_id: &str,
    ) -> Result<(), StoreError> {
        repositories::classes::ensure_membership(
            &mut *self.tx,
            class_id,
            student_id,
            primitive_now_utc(),
        )
        .await?;
        Ok(())
    }

    async fn find_parent_by_phone(
        &mut self,
        school_id: &str,
        mobile: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(repositories::users::find_parent_id_by_phone(&mut *self.tx, school_id, mobile).await?)
    }

    async fn find_parent_by_email(
        &mut self,
        school_id: &str,
        email: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(repositories::users::find_id_by_email(
            &mut *self.tx,
            school_id,
            email,
            Some(UserRole::Parent),
        )
        .await?)
    }

    async fn insert_parent(&mut self, parent: NewParent<'_>) -> Result<String, StoreError> {
        let user = repositories::users::create(
            &mut *self.tx,
            repositories::users::CreateUser {
                id: &Uuid::new_v4().to_string(),
                school_id: parent.school_id,
                role: UserRole::Parent,
                username: parent.mobile,
                national_id: None,
                first_name: parent.first_name,
                last_name: parent.last_name,
                email: parent.email,
                phone: Some(parent.mobile),
                birth_date: None,
                hashed_password: parent.hashed_password,
                now: primitive_now_utc(),
            },
        )
        .await?;
        Ok(user.id)
    }

    async fn update_parent(
        &mut self,
        parent_id: &str,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
    ) -> Result<(), StoreError> {
        repositories::users::update_contact(
            &mut *self.tx,
            parent_id,
            first_name,
            last_name,
            email,
            primitive_now_utc(),
        )
        .await?;
        Ok(())
    }

    async fn upsert_parent_relation(
        &mut self,
        parent_id: &str,
        student_id: &str,
        relationship: RelationshipRole,
    ) -> Result<(), StoreError> {
        repositories::parent_relations::upsert(
            &mut *self.tx,
            parent_id,
            student_id,
            relationship,
            primitive_now_utc(),
        )
        .await?;
        Ok(())
    }

    async fn find_class_student(
        &mut self,
        school_id: &str,
        class_id: &str,
        national_id: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(repositories::classes::find_member_by_national_id(
            &mut *self.tx,
            school_id,
            class_id,
            national_id,
        )
        .await?)
    }

    async fn insert_activity(&mut self, activity: NewActivity<'_>) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        repositories::activities::create(
            &mut *self.tx,
            repositories::activities::CreateActivity {
                id: &id,
                school_id: activity.school_id,
                student_id: activity.student_id,
                class_id: activity.class_id,
                subject_id: activity.subject_id,
                teacher_id: activity.teacher_id,
                activity_type: activity.activity_type,
                title: activity.title,
                activity_date: activity.date,
                quantitative_score: activity.score,
                qualitative_evaluation: activity.qualitative_evaluation,
                description: activity.description,
                created_at: primitive_now_utc(),
            },
        )
        .await?;
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
