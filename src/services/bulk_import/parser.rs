use thiserror::Error;

use super::columns::{normalize_label, ColumnId, ColumnLayout};

pub(crate) const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub(crate) enum ParseError {
    #[error("فایل خالی است")]
    Empty,
    #[error("سطر عنوان ستون‌ها یافت نشد")]
    MissingHeader,
    #[error("فایل با کدگذاری UTF-8 ذخیره نشده است")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("خطا در خواندن فایل CSV: {0}")]
    Malformed(#[from] csv::Error),
    #[error("تعداد ردیف‌های فایل بیش از حد مجاز ({limit}) است")]
    TooManyRows { limit: usize },
}

/// One data row, normalized against a layout. `number` is the 1-based line
/// in the source file (header is line 1).
#[derive(Debug, Clone)]
pub(crate) struct ImportRow {
    number: usize,
    layout: &'static ColumnLayout,
    values: Vec<String>,
    raw_len: usize,
}

impl ImportRow {
    pub(crate) fn new(
        number: usize,
        layout: &'static ColumnLayout,
        values: Vec<String>,
        raw_len: usize,
    ) -> Self {
        Self { number, layout, values, raw_len }
    }

    pub(crate) fn number(&self) -> usize {
        self.number
    }

    pub(crate) fn layout(&self) -> &'static ColumnLayout {
        self.layout
    }

    /// Cell count as written in the file, before normalization.
    pub(crate) fn raw_len(&self) -> usize {
        self.raw_len
    }

    /// Trimmed cell text; empty when the column is absent from the row.
    pub(crate) fn get(&self, id: ColumnId) -> &str {
        self.layout
            .position(id)
            .and_then(|index| self.values.get(index))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub(crate) fn optional(&self, id: ColumnId) -> Option<&str> {
        Some(self.get(id)).filter(|value| !value.is_empty())
    }

    pub(crate) fn first_cell(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug)]
pub(crate) struct ParsedFile {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: Vec<ImportRow>,
}

pub(crate) fn parse(
    bytes: &[u8],
    layout: &'static ColumnLayout,
    max_rows: usize,
) -> Result<ParsedFile, ParseError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)?;
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = loop {
        match records.next() {
            Some(record) => {
                let record = record?;
                if record.iter().any(|cell| !cell.is_empty()) {
                    break record;
                }
            }
            None => return Err(ParseError::MissingHeader),
        }
    };
    let headers: Vec<String> = header.iter().map(str::to_string).collect();
    let mapping = resolve_columns(&headers, layout);

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if rows.len() == max_rows {
            return Err(ParseError::TooManyRows { limit: max_rows });
        }

        let number = record.position().map(|position| position.line() as usize).unwrap_or(0);
        let values = mapping
            .iter()
            .map(|index| record.get(*index).unwrap_or("").to_string())
            .collect();
        rows.push(ImportRow::new(number, layout, values, record.len()));
    }

    Ok(ParsedFile { headers, rows })
}

/// Source index for every layout column: exact label, then normalized label,
/// then the column's own position.
fn resolve_columns(headers: &[String], layout: &ColumnLayout) -> Vec<usize> {
    let normalized: Vec<String> = headers.iter().map(|header| normalize_label(header)).collect();

    layout
        .columns
        .iter()
        .enumerate()
        .map(|(position, column)| {
            let exact = layout.header(column);
            headers
                .iter()
                .position(|header| *header == exact || header == column.label)
                .or_else(|| {
                    let wanted = normalize_label(column.label);
                    normalized.iter().position(|header| *header == wanted)
                })
                .unwrap_or(position)
        })
        .collect()
}
