use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::parser::ImportRow;
use super::processor::{ImportKind, ImportOutcomeRecord, OutcomeKind};
use super::progress::{ImportEvent, ImportSummary, ProgressReporter};
use super::store::ImportStore;
use super::validator::ValidationOutcome;
use crate::core::shutdown::ShutdownHandle;

/// Bounds on a single import run.
#[derive(Debug, Clone)]
pub(crate) struct ImportLimits {
    pub(crate) max_duration: Duration,
    pub(crate) shutdown: Option<ShutdownHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunStatus {
    Completed,
    StoppedEarly,
    Aborted,
}

impl RunStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::StoppedEarly => "stopped_early",
            Self::Aborted => "aborted",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum StopReason {
    Deadline(Duration),
    Shutdown,
    Disconnected,
}

impl StopReason {
    fn describe(self) -> String {
        match self {
            Self::Deadline(limit) => {
                format!("مهلت {} ثانیه‌ای پردازش به پایان رسید", limit.as_secs())
            }
            Self::Shutdown => "سرور در حال خاموش شدن است".to_string(),
            Self::Disconnected => "ارتباط با کاربر قطع شد".to_string(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Deadline(_) => "deadline",
            Self::Shutdown => "shutdown",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Per-row outcomes plus an optional note on why the run stopped early.
#[derive(Default)]
struct Report {
    outcomes: Vec<ImportOutcomeRecord>,
    stop_note: Option<String>,
}

impl Report {
    fn record(&mut self, row: usize, kind: OutcomeKind, message: impl Into<String>) {
        self.outcomes.push(ImportOutcomeRecord { row, kind, message: message.into() });
    }

    /// Success and error lines, each in row order.
    fn into_lines(mut self) -> (String, String) {
        self.outcomes.sort_by_key(|outcome| outcome.row);
        let (failed, succeeded): (Vec<_>, Vec<_>) =
            self.outcomes.iter().partition(|outcome| outcome.kind == OutcomeKind::Failed);

        let message = succeeded.iter().map(|outcome| outcome.line()).collect::<Vec<_>>().join("\n");
        let mut errors: Vec<String> = failed.iter().map(|outcome| outcome.line()).collect();
        errors.extend(self.stop_note);
        (message, errors.join("\n"))
    }
}

/// Validates every row, then persists valid rows one at a time, each in its
/// own unit of work. Emits one zero-progress event, one progress event per
/// attempted row and finally exactly one `result` or `error` event.
pub(crate) async fn run_import<K: ImportKind>(
    kind: &K,
    store: &dyn ImportStore,
    rows: Vec<ImportRow>,
    events: mpsc::Sender<ImportEvent>,
    limits: &ImportLimits,
) -> RunStatus {
    let started = Instant::now();
    let deadline = started + limits.max_duration;
    let mut summary = ImportSummary::default();
    let mut report = Report::default();

    let total_rows = rows.len();
    let mut valid = Vec::with_capacity(total_rows);
    for row in &rows {
        match kind.validate(row) {
            ValidationOutcome::Valid(record) => valid.push((row.number(), record)),
            ValidationOutcome::Invalid(messages) => {
                summary.failed += 1;
                report.record(row.number(), OutcomeKind::Failed, messages.join("؛ "));
                record_row(kind.name(), "invalid");
            }
            ValidationOutcome::Placeholder => summary.skipped += 1,
        }
    }

    let total = valid.len();
    tracing::info!(
        kind = kind.name(),
        rows = total_rows,
        valid = total,
        invalid = summary.failed,
        skipped = summary.skipped,
        "Import validated"
    );

    let mut reporter = ProgressReporter::new(events, total);
    reporter.progress(0, "شروع پردازش").await;

    let mut status = RunStatus::Completed;
    for (index, (row, record)) in valid.into_iter().enumerate() {
        if let Some(reason) = stop_reason(&reporter, deadline, limits) {
            let remaining = total - index;
            tracing::warn!(
                kind = kind.name(),
                row,
                remaining,
                reason = reason.as_str(),
                "Import stopped before completion"
            );
            report.stop_note = Some(format!(
                "پردازش متوقف شد ({})؛ {remaining} ردیف پردازش نشد",
                reason.describe()
            ));
            summary.stopped_early = true;
            status = RunStatus::StoppedEarly;
            break;
        }

        let outcome = match kind.process(store, record).await {
            Ok(processed) => {
                tracing::debug!(
                    kind = kind.name(),
                    row,
                    outcome = processed.kind.as_str(),
                    "Row imported"
                );
                match processed.kind {
                    OutcomeKind::Created => summary.created += 1,
                    OutcomeKind::Updated => summary.updated += 1,
                    OutcomeKind::Failed => summary.failed += 1,
                }
                report.record(row, processed.kind, processed.message);
                processed.kind
            }
            Err(err) if err.is_unavailable() => {
                tracing::error!(kind = kind.name(), row, error = %err, "Import aborted");
                record_row(kind.name(), OutcomeKind::Failed.as_str());
                record_run(kind.name(), RunStatus::Aborted, started);

                let message = format!(
                    "{}؛ {} ردیف پیش از توقف پردازش شد",
                    err.localized(),
                    summary.processed
                );
                let remaining = total - index - 1;
                summary.processed += 1;
                summary.failed += 1;
                summary.stopped_early = true;
                report.record(row, OutcomeKind::Failed, err.localized());
                if remaining > 0 {
                    report.stop_note = Some(format!("{remaining} ردیف پردازش نشد"));
                }
                (summary.message, summary.errors) = report.into_lines();
                reporter.fail(message, summary).await;
                return RunStatus::Aborted;
            }
            Err(err) => {
                tracing::warn!(kind = kind.name(), row, error = %err, "Row failed");
                summary.failed += 1;
                report.record(row, OutcomeKind::Failed, err.localized());
                OutcomeKind::Failed
            }
        };

        record_row(kind.name(), outcome.as_str());
        summary.processed += 1;
        let note = match outcome {
            OutcomeKind::Failed => format!("ردیف {row} ناموفق بود"),
            _ => format!("ردیف {row} پردازش شد"),
        };
        reporter.progress(summary.processed, note).await;
    }

    (summary.message, summary.errors) = report.into_lines();

    tracing::info!(
        kind = kind.name(),
        created = summary.created,
        updated = summary.updated,
        processed = summary.processed,
        failed = summary.failed,
        stopped_early = summary.stopped_early,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Import finished"
    );
    record_run(kind.name(), status, started);
    reporter.finish(summary).await;
    status
}

fn stop_reason(
    reporter: &ProgressReporter,
    deadline: Instant,
    limits: &ImportLimits,
) -> Option<StopReason> {
    if reporter.is_closed() {
        return Some(StopReason::Disconnected);
    }
    if limits.shutdown.as_ref().is_some_and(ShutdownHandle::is_triggered) {
        return Some(StopReason::Shutdown);
    }
    if Instant::now() >= deadline {
        return Some(StopReason::Deadline(limits.max_duration));
    }
    None
}

fn record_row(kind: &'static str, outcome: &'static str) {
    metrics::counter!("import_rows_total", "kind" => kind, "outcome" => outcome).increment(1);
}

fn record_run(kind: &'static str, status: RunStatus, started: Instant) {
    metrics::counter!("import_runs_total", "kind" => kind, "status" => status.as_str())
        .increment(1);
    metrics::histogram!("import_duration_seconds", "kind" => kind)
        .record(started.elapsed().as_secs_f64());
}
