use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Router,
};
use futures::Stream;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentPrincipal, CurrentTeacher};
use crate::core::state::AppState;
use crate::repositories;
use crate::services::bulk_import::columns::{ColumnLayout, ACTIVITY_LAYOUT, STUDENT_LAYOUT};
use crate::services::bulk_import::hasher::Argon2Hasher;
use crate::services::bulk_import::parser::{self, ImportRow, UTF8_BOM};
use crate::services::bulk_import::pipeline::{run_import, ImportLimits};
use crate::services::bulk_import::postgres::PgImportStore;
use crate::services::bulk_import::processor::{ActivityImport, ImportKind, StudentImport};
use crate::services::bulk_import::progress::ImportEvent;
use crate::services::bulk_import::validator::RowValidator;

/// Slack for multipart framing and the small text fields around the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub(crate) fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/students", post(import_students))
        .route("/activities", post(import_activities))
        .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD_BYTES))
        .route("/templates/:kind", get(template))
}

struct UploadForm {
    file: Vec<u8>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|value| value.trim()).filter(|value| !value.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<&str, ApiError> {
        self.field(name).ok_or_else(|| ApiError::BadRequest(format!("Field '{name}' is required")))
    }
}

async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<UploadForm, ApiError> {
    let mut file: Option<Vec<u8>> = None;
    let mut fields = HashMap::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                if bytes.len() + chunk.len() > max_bytes {
                    return Err(ApiError::PayloadTooLarge(format!(
                        "File size exceeds {}MB limit",
                        max_bytes / (1024 * 1024)
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            file = Some(bytes);
        } else if !name.is_empty() {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest(format!("Invalid value for '{name}'")))?;
            fields.insert(name, text);
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("Field 'file' is required".to_string()))?;
    Ok(UploadForm { file, fields })
}

fn parse_rows(
    state: &AppState,
    upload: &UploadForm,
    layout: &'static ColumnLayout,
    school_id: &str,
) -> Result<Vec<ImportRow>, ApiError> {
    let parsed = parser::parse(&upload.file, layout, state.settings().import().max_rows)
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    tracing::info!(
        school_id = %school_id,
        kind = layout.kind,
        bytes = upload.file.len(),
        columns = parsed.headers.len(),
        rows = parsed.rows.len(),
        sha256 = %hex::encode(Sha256::digest(&upload.file)),
        "Import upload received"
    );
    Ok(parsed.rows)
}

fn validator() -> Result<RowValidator, ApiError> {
    RowValidator::new().map_err(|e| ApiError::internal(e, "Failed to build row validator"))
}

async fn import_students(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = read_upload(multipart, state.settings().import().max_upload_bytes()).await?;

    let class_id = match upload.field("class_id") {
        Some(class_id) => {
            repositories::classes::find_in_school(state.db(), &principal.school_id, class_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load class"))?
                .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))?;
            Some(class_id.to_string())
        }
        None => None,
    };

    let kind = StudentImport::new(
        principal.school_id.clone(),
        class_id,
        validator()?,
        Arc::new(Argon2Hasher),
    );
    let rows = parse_rows(&state, &upload, kind.layout(), &principal.school_id)?;

    Ok(spawn_import(&state, kind, rows, &principal.school_id))
}

async fn import_activities(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = read_upload(multipart, state.settings().import().max_upload_bytes()).await?;
    let class_id = upload.required("class_id")?;
    let subject_id = upload.required("subject_id")?;

    repositories::classes::find_in_school(state.db(), &teacher.school_id, class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))?;

    let assigned = repositories::lessons::is_assigned(state.db(), &teacher.id, class_id, subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check lesson assignment"))?;
    if !assigned {
        tracing::warn!(
            user_id = %teacher.id,
            class_id = %class_id,
            subject_id = %subject_id,
            "Teacher is not assigned to the lesson"
        );
        return Err(ApiError::Forbidden("Not assigned to this class and subject"));
    }

    let kind = ActivityImport::new(
        teacher.school_id.clone(),
        class_id.to_string(),
        subject_id.to_string(),
        teacher.id.clone(),
        validator()?,
    );
    let rows = parse_rows(&state, &upload, kind.layout(), &teacher.school_id)?;

    Ok(spawn_import(&state, kind, rows, &teacher.school_id))
}

/// Runs the import on its own task and streams its events back as SSE.
/// Dropping the response closes the channel, which stops the run.
fn spawn_import<K>(
    state: &AppState,
    kind: K,
    rows: Vec<ImportRow>,
    school_id: &str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    K: ImportKind + 'static,
{
    let settings = state.settings().import();
    let (tx, rx) = mpsc::channel(settings.event_buffer);
    let limits = ImportLimits {
        max_duration: settings.max_duration(),
        shutdown: Some(state.shutdown().clone()),
    };
    let store = PgImportStore::new(state.db().clone());
    let span = tracing::info_span!("import", kind = kind.name(), school_id = %school_id);

    tokio::spawn(
        async move {
            run_import(&kind, &store, rows, tx, &limits).await;
        }
        .instrument(span),
    );

    event_stream(rx)
}

fn event_stream(
    rx: mpsc::Receiver<ImportEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok(to_sse(&event)), rx))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &ImportEvent) -> Event {
    match Event::default().event(event.name()).json_data(event) {
        Ok(sse) => sse,
        Err(err) => {
            tracing::error!(error = %err, "Failed to encode import event");
            Event::default()
                .event("error")
                .data(r#"{"type":"error","message":"خطای داخلی سرور"}"#)
        }
    }
}

fn layout_for(kind: &str) -> Option<&'static ColumnLayout> {
    [&STUDENT_LAYOUT, &ACTIVITY_LAYOUT].into_iter().find(|layout| layout.kind == kind)
}

fn template_csv(layout: &ColumnLayout) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(layout.headers())?;
    writer.write_record(layout.example)?;
    writer.into_inner().map_err(|err| err.into_error().into())
}

async fn template(Path(kind): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let layout =
        layout_for(&kind).ok_or_else(|| ApiError::NotFound(format!("Unknown import kind '{kind}'")))?;
    let body = template_csv(layout).map_err(|e| ApiError::internal(e, "Failed to build template"))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}-template.csv\"", layout.kind),
            ),
        ],
        body,
    ))
}
