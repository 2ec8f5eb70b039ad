use time::{Date, PrimitiveDateTime};

use crate::db::types::ActivityType;

pub(crate) struct CreateActivity<'a> {
    pub(crate) id: &'a str,
    pub(crate) school_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) class_id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) teacher_id: &'a str,
    pub(crate) activity_type: ActivityType,
    pub(crate) title: &'a str,
    pub(crate) activity_date: Date,
    pub(crate) quantitative_score: Option<f64>,
    pub(crate) qualitative_evaluation: Option<&'a str>,
    pub(crate) description: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateActivity<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO educational_activities (
            id, school_id, student_id, class_id, subject_id, teacher_id, activity_type,
            title, activity_date, quantitative_score, qualitative_evaluation, description,
            created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)",
    )
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.student_id)
    .bind(params.class_id)
    .bind(params.subject_id)
    .bind(params.teacher_id)
    .bind(params.activity_type)
    .bind(params.title)
    .bind(params.activity_date)
    .bind(params.quantitative_score)
    .bind(params.qualitative_evaluation)
    .bind(params.description)
    .bind(params.created_at)
    .execute(executor)
    .await?;
    Ok(())
}
