use serde::Serialize;
use tokio::sync::mpsc;

/// Wire events of an import stream. Serialized with a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum ImportEvent {
    Progress { percentage: u8, processed: usize, total: usize, status: String },
    Result(ImportSummary),
    /// Aborted run. `summary` holds what was done before the abort.
    Error { message: String, summary: ImportSummary },
}

impl ImportEvent {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Result(_) => "result",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct ImportSummary {
    pub(crate) created: usize,
    pub(crate) updated: usize,
    pub(crate) processed: usize,
    pub(crate) failed: usize,
    pub(crate) skipped: usize,
    pub(crate) stopped_early: bool,
    /// Newline-joined success lines in row order.
    pub(crate) message: String,
    /// Newline-joined error lines in row order.
    pub(crate) errors: String,
}

/// An empty batch is complete only once its result is sent, so it stays at 0.
pub(crate) fn percentage(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let value = (processed.min(total) as f64 * 100.0 / total as f64).round();
    value as u8
}

/// Sending half of an import stream. Progress may be reported any number of
/// times; `finish` and `fail` consume the reporter, so exactly one terminal
/// event is ever written and nothing can follow it.
#[derive(Debug)]
pub(crate) struct ProgressReporter {
    tx: mpsc::Sender<ImportEvent>,
    total: usize,
    last_processed: usize,
}

impl ProgressReporter {
    pub(crate) fn new(tx: mpsc::Sender<ImportEvent>, total: usize) -> Self {
        Self { tx, total, last_processed: 0 }
    }

    /// Whether the receiving side has gone away.
    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Returns `false` once the receiver is gone.
    pub(crate) async fn progress(&mut self, processed: usize, status: impl Into<String>) -> bool {
        let processed = processed.max(self.last_processed).min(self.total);
        self.last_processed = processed;

        let event = ImportEvent::Progress {
            percentage: percentage(processed, self.total),
            processed,
            total: self.total,
            status: status.into(),
        };
        self.tx.send(event).await.is_ok()
    }

    pub(crate) async fn finish(self, summary: ImportSummary) {
        if self.tx.send(ImportEvent::Result(summary)).await.is_err() {
            tracing::debug!("Import stream closed before the result was delivered");
        }
    }

    pub(crate) async fn fail(self, message: impl Into<String>, summary: ImportSummary) {
        let event = ImportEvent::Error { message: message.into(), summary };
        if self.tx.send(event).await.is_err() {
            tracing::debug!("Import stream closed before the error was delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_rounded_and_zero_for_empty_batches() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(5, 3), 100);
    }

    #[tokio::test]
    async fn progress_never_goes_backwards() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut reporter = ProgressReporter::new(tx, 4);

        assert!(reporter.progress(2, "a").await);
        assert!(reporter.progress(1, "b").await);
        reporter.finish(ImportSummary::default()).await;

        let mut processed = Vec::new();
        while let Some(event) = rx.recv().await {
            if let ImportEvent::Progress { processed: value, .. } = event {
                processed.push(value);
            }
        }
        assert_eq!(processed, vec![2, 2]);
    }

    #[tokio::test]
    async fn empty_batch_starts_at_zero_percent() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut reporter = ProgressReporter::new(tx, 0);

        reporter.progress(0, "start").await;
        drop(reporter);

        match rx.recv().await {
            Some(ImportEvent::Progress { percentage, processed, total, .. }) => {
                assert_eq!((percentage, processed, total), (0, 0, 0));
            }
            other => panic!("expected a progress event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn closed_receiver_is_reported() {
        let (tx, rx) = mpsc::channel(1);
        let mut reporter = ProgressReporter::new(tx, 1);
        drop(rx);

        assert!(reporter.is_closed());
        assert!(!reporter.progress(1, "done").await);
    }

    #[test]
    fn events_carry_a_type_discriminator() {
        let event = ImportEvent::Progress {
            percentage: 50,
            processed: 1,
            total: 2,
            status: "ok".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["percentage"], 50);

        let json = serde_json::to_value(ImportEvent::Result(ImportSummary {
            created: 2,
            ..ImportSummary::default()
        }))
        .unwrap();
        assert_eq!(json["type"], "result");
        assert_eq!(json["created"], 2);
        assert_eq!(json["stopped_early"], false);

        let json = serde_json::to_value(ImportEvent::Error {
            message: "x".into(),
            summary: ImportSummary { failed: 1, ..ImportSummary::default() },
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "x");
        assert_eq!(json["summary"]["failed"], 1);
    }
}
