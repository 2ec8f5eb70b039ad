use regex::Regex;
use time::Date;

use super::columns::{ColumnId, ColumnLayout, Guardian};
use super::parser::ImportRow;
use crate::db::types::{ActivityType, Evaluation, RelationshipRole};
use crate::services::jalali::{JalaliDate, MAX_YEAR, MIN_YEAR};

const PLACEHOLDER_MARKERS: [&str; 3] = ["مثال", "نمونه", "example"];
const MAX_SCORE: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ValidationOutcome<T> {
    Valid(T),
    Invalid(Vec<String>),
    /// The template's example row; neither imported nor reported.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StudentRecord {
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) national_id: String,
    pub(crate) email: Option<String>,
    pub(crate) mobile: Option<String>,
    pub(crate) birth_date: Option<Date>,
    pub(crate) guardians: Vec<GuardianRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GuardianRecord {
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) mobile: String,
    pub(crate) email: Option<String>,
    pub(crate) relationship: RelationshipRole,
}

impl GuardianRecord {
    pub(crate) fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ActivityRecord {
    pub(crate) national_id: String,
    pub(crate) activity_type: ActivityType,
    pub(crate) title: String,
    pub(crate) date: Date,
    pub(crate) jalali_date: JalaliDate,
    pub(crate) score: Option<f64>,
    pub(crate) qualitative_evaluation: Option<String>,
    pub(crate) description: Option<String>,
}

/// Structural checks for import rows. Every rule runs; violations are
/// collected rather than returned at the first failure.
#[derive(Debug, Clone)]
pub(crate) struct RowValidator {
    national_id: Regex,
    mobile: Regex,
    email: Regex,
    score: Regex,
}

impl RowValidator {
    pub(crate) fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            national_id: Regex::new(r"^[0-9]{10}$")?,
            mobile: Regex::new(r"^09[0-9]{9}$")?,
            email: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?,
            score: Regex::new(r"^[0-9]{1,2}(\.[0-9]{1,2})?$")?,
        })
    }

    pub(crate) fn validate_student(&self, row: &ImportRow) -> ValidationOutcome<StudentRecord> {
        let mut errors = Violations::new(row.layout());
        if is_placeholder(row) {
            return ValidationOutcome::Placeholder;
        }
        errors.check_column_count(row);

        let first_name = errors.required(row, ColumnId::FirstName);
        let last_name = errors.required(row, ColumnId::LastName);
        let national_id = errors.required(row, ColumnId::NationalId).map(normalize_digits);
        if let Some(value) = &national_id {
            if !self.national_id.is_match(value) {
                errors.push(format!("کد ملی «{value}» باید دقیقاً ۱۰ رقم باشد"));
            }
        }

        let email = self.email(row, ColumnId::Email, &mut errors);
        let mobile = self.mobile(row, ColumnId::Mobile, &mut errors);
        let birth_date = row.optional(ColumnId::BirthDate).and_then(|value| {
            errors.date(ColumnId::BirthDate, value).map(|(_, date)| date)
        });

        let mut guardians = Vec::new();
        for (slot, default_role) in
            [(Guardian::First, RelationshipRole::Father), (Guardian::Second, RelationshipRole::Mother)]
        {
            if let Some(guardian) = self.guardian(row, slot, default_role, &mut errors) {
                guardians.push(guardian);
            }
        }
        if let [first, second] = guardians.as_slice() {
            if first.mobile == second.mobile {
                errors.push(format!(
                    "شماره موبایل «{}» برای هر دو ولی تکرار شده است",
                    first.mobile
                ));
            }
            if let (Some(a), Some(b)) = (&first.email, &second.email) {
                if a == b {
                    errors.push(format!("ایمیل «{a}» برای هر دو ولی تکرار شده است"));
                }
            }
        }

        match (errors.finish(), first_name, last_name, national_id) {
            (None, Some(first_name), Some(last_name), Some(national_id)) => {
                ValidationOutcome::Valid(StudentRecord {
                    first_name,
                    last_name,
                    national_id,
                    email,
                    mobile,
                    birth_date,
                    guardians,
                })
            }
            (Some(messages), ..) => ValidationOutcome::Invalid(messages),
            _ => ValidationOutcome::Invalid(vec!["ردیف ناقص است".to_string()]),
        }
    }

    pub(crate) fn validate_activity(&self, row: &ImportRow) -> ValidationOutcome<ActivityRecord> {
        let mut errors = Violations::new(row.layout());
        if is_placeholder(row) {
            return ValidationOutcome::Placeholder;
        }
        errors.check_column_count(row);

        let national_id = errors.required(row, ColumnId::StudentNationalId).map(normalize_digits);
        if let Some(value) = &national_id {
            if !self.national_id.is_match(value) {
                errors.push(format!("کد ملی «{value}» باید دقیقاً ۱۰ رقم باشد"));
            }
        }

        let activity_type = errors.required(row, ColumnId::ActivityType).and_then(|label| {
            let parsed = ActivityType::from_label(&label);
            if parsed.is_none() {
                let allowed: Vec<&str> = ActivityType::ALL.iter().map(|kind| kind.label()).collect();
                errors.push(format!(
                    "نوع فعالیت «{label}» معتبر نیست؛ مقادیر مجاز: {}",
                    allowed.join("، ")
                ));
            }
            parsed
        });

        let title = errors.required(row, ColumnId::Title);
        let date = errors
            .required(row, ColumnId::ActivityDate)
            .and_then(|value| errors.date(ColumnId::ActivityDate, &value));

        let score = row.optional(ColumnId::QuantitativeScore).and_then(|value| {
            let parsed = self.score(value);
            if parsed.is_none() {
                errors.push(format!(
                    "نمره کمی «{value}» باید عددی بین ۰ تا ۲۰ با حداکثر دو رقم اعشار باشد"
                ));
            }
            parsed
        });
        let qualitative_evaluation = row.optional(ColumnId::QualitativeEvaluation).map(str::to_string);
        let description = row.optional(ColumnId::Description).map(str::to_string);

        if let Some(kind) = activity_type {
            let (missing, column) = match kind.evaluation() {
                Evaluation::Quantitative => (
                    row.optional(ColumnId::QuantitativeScore).is_none(),
                    ColumnId::QuantitativeScore,
                ),
                Evaluation::Qualitative => (
                    qualitative_evaluation.is_none(),
                    ColumnId::QualitativeEvaluation,
                ),
            };
            if missing {
                errors.push(format!(
                    "{} برای نوع فعالیت «{}» الزامی است",
                    errors.label(column),
                    kind.label()
                ));
            }
        }

        match (errors.finish(), national_id, activity_type, title, date) {
            (None, Some(national_id), Some(activity_type), Some(title), Some((jalali_date, date))) => {
                ValidationOutcome::Valid(ActivityRecord {
                    national_id,
                    activity_type,
                    title,
                    date,
                    jalali_date,
                    score,
                    qualitative_evaluation,
                    description,
                })
            }
            (Some(messages), ..) => ValidationOutcome::Invalid(messages),
            _ => ValidationOutcome::Invalid(vec!["ردیف ناقص است".to_string()]),
        }
    }

    fn guardian(
        &self,
        row: &ImportRow,
        slot: Guardian,
        default_role: RelationshipRole,
        errors: &mut Violations,
    ) -> Option<GuardianRecord> {
        let columns = [
            ColumnId::GuardianName(slot),
            ColumnId::GuardianMobile(slot),
            ColumnId::GuardianEmail(slot),
            ColumnId::GuardianRelationship(slot),
        ];
        if columns.iter().all(|column| row.optional(*column).is_none()) {
            return None;
        }

        let name = errors.required(row, ColumnId::GuardianName(slot));
        let mobile = match row.optional(ColumnId::GuardianMobile(slot)) {
            Some(_) => self.mobile(row, ColumnId::GuardianMobile(slot), errors),
            None => errors.required(row, ColumnId::GuardianMobile(slot)),
        };
        let email = self.email(row, ColumnId::GuardianEmail(slot), errors);
        let relationship = match row.optional(ColumnId::GuardianRelationship(slot)) {
            None => Some(default_role),
            Some(label) => {
                let parsed = RelationshipRole::from_label(label);
                if parsed.is_none() {
                    let allowed: Vec<&str> =
                        RelationshipRole::LABELS.iter().map(|(label, _)| *label).collect();
                    errors.push(format!(
                        "{} «{label}» معتبر نیست؛ مقادیر مجاز: {}",
                        errors.label(ColumnId::GuardianRelationship(slot)),
                        allowed.join("، ")
                    ));
                }
                parsed
            }
        };

        let name = name?;
        let (first_name, last_name) = split_full_name(&name);
        Some(GuardianRecord { first_name, last_name, mobile: mobile?, email, relationship: relationship? })
    }

    fn mobile(&self, row: &ImportRow, column: ColumnId, errors: &mut Violations) -> Option<String> {
        let value = normalize_digits(row.optional(column)?.to_string());
        if self.mobile.is_match(&value) {
            Some(value)
        } else {
            errors.push(format!(
                "{} «{value}» معتبر نیست؛ باید با ۰۹ شروع شود و ۱۱ رقم باشد",
                errors.label(column)
            ));
            None
        }
    }

    fn email(&self, row: &ImportRow, column: ColumnId, errors: &mut Violations) -> Option<String> {
        let value = row.optional(column)?;
        if self.email.is_match(value) {
            Some(value.to_lowercase())
        } else {
            errors.push(format!("{} «{value}» معتبر نیست", errors.label(column)));
            None
        }
    }

    fn score(&self, value: &str) -> Option<f64> {
        let value = normalize_digits(value.replace(['٫', '/'], "."));
        if !self.score.is_match(&value) {
            return None;
        }
        value.parse::<f64>().ok().filter(|score| (0.0..=MAX_SCORE).contains(score))
    }
}

struct Violations {
    layout: &'static ColumnLayout,
    messages: Vec<String>,
}

impl Violations {
    fn new(layout: &'static ColumnLayout) -> Self {
        Self { layout, messages: Vec::new() }
    }

    fn push(&mut self, message: String) {
        self.messages.push(message);
    }

    fn label(&self, column: ColumnId) -> &'static str {
        self.layout.column(column).map(|column| column.label).unwrap_or("")
    }

    fn check_column_count(&mut self, row: &ImportRow) {
        let expected = self.layout.len();
        if row.raw_len() != expected {
            self.push(format!(
                "تعداد ستون‌ها نادرست است: {expected} ستون مورد انتظار بود اما {} ستون یافت شد",
                row.raw_len()
            ));
        }
    }

    fn required(&mut self, row: &ImportRow, column: ColumnId) -> Option<String> {
        match row.optional(column) {
            Some(value) => Some(value.to_string()),
            None => {
                self.push(format!("{} الزامی است", self.label(column)));
                None
            }
        }
    }

    fn date(&mut self, column: ColumnId, value: &str) -> Option<(JalaliDate, Date)> {
        let parsed = JalaliDate::parse(&normalize_digits(value.to_string()))
            .and_then(|jalali| jalali.to_gregorian().map(|date| (jalali, date)));
        match parsed {
            Ok(pair) => Some(pair),
            Err(_) => {
                self.push(format!(
                    "{} «{value}» معتبر نیست؛ قالب مورد انتظار YYYY-MM-DD با سال بین {MIN_YEAR} تا {MAX_YEAR} است",
                    self.label(column)
                ));
                None
            }
        }
    }

    fn finish(self) -> Option<Vec<String>> {
        if self.messages.is_empty() {
            None
        } else {
            Some(self.messages)
        }
    }
}

fn is_placeholder(row: &ImportRow) -> bool {
    let first = row.first_cell().trim().to_lowercase();
    PLACEHOLDER_MARKERS.contains(&first.as_str())
}

/// Maps Persian and Arabic-Indic digits to ASCII.
pub(crate) fn normalize_digits(value: String) -> String {
    if value.is_ascii() {
        return value;
    }
    value
        .chars()
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            other => other,
        })
        .collect()
}

fn split_full_name(name: &str) -> (String, String) {
    match name.trim().split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::bulk_import::columns::{ACTIVITY_LAYOUT, STUDENT_LAYOUT};
    use time::macros::date;

    fn student_row(cells: &[&str]) -> ImportRow {
        let mut values: Vec<String> = cells.iter().map(|cell| cell.to_string()).collect();
        let raw_len = values.len();
        values.resize(STUDENT_LAYOUT.len(), String::new());
        ImportRow::new(2, &STUDENT_LAYOUT, values, raw_len)
    }

    fn activity_row(cells: &[&str]) -> ImportRow {
        let mut values: Vec<String> = cells.iter().map(|cell| cell.to_string()).collect();
        let raw_len = values.len();
        values.resize(ACTIVITY_LAYOUT.len(), String::new());
        ImportRow::new(2, &ACTIVITY_LAYOUT, values, raw_len)
    }

    fn padded_student(cells: &[&str]) -> ImportRow {
        let mut full: Vec<&str> = cells.to_vec();
        full.resize(STUDENT_LAYOUT.len(), "");
        student_row(&full)
    }

    fn validator() -> RowValidator {
        RowValidator::new().unwrap()
    }

    #[test]
    fn valid_student_with_default_guardian_roles() {
        let row = padded_student(&[
            "سارا",
            "رضایی",
            "۰۰۱۲۳۴۵۶۷۸",
            "Sara@Example.com",
            "09120000001",
            "1390-05-12",
            "علی رضایی",
            "09121111111",
            "",
            "",
            "مریم احمدی",
            "09122222222",
            "",
            "",
        ]);

        let ValidationOutcome::Valid(record) = validator().validate_student(&row) else {
            panic!("expected valid row");
        };
        assert_eq!(record.national_id, "0012345678");
        assert_eq!(record.email.as_deref(), Some("sara@example.com"));
        assert_eq!(record.birth_date, Some(date!(2011 - 08 - 03)));
        assert_eq!(record.guardians.len(), 2);
        assert_eq!(record.guardians[0].relationship, RelationshipRole::Father);
        assert_eq!(record.guardians[0].first_name, "علی");
        assert_eq!(record.guardians[0].last_name, "رضایی");
        assert_eq!(record.guardians[1].relationship, RelationshipRole::Mother);
    }

    #[test]
    fn every_missing_required_field_is_reported() {
        let row = padded_student(&["", "", "0012345678"]);

        let ValidationOutcome::Invalid(messages) = validator().validate_student(&row) else {
            panic!("expected invalid row");
        };
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(messages[0].contains("نام"));
        assert!(messages[1].contains("نام خانوادگی"));
    }

    #[test]
    fn short_national_id_is_echoed() {
        let row = padded_student(&["سارا", "رضایی", "001234567"]);

        let ValidationOutcome::Invalid(messages) = validator().validate_student(&row) else {
            panic!("expected invalid row");
        };
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("001234567"));
    }

    #[test]
    fn other_digit_scripts_are_rejected() {
        let row = padded_student(&["سارا", "رضایی", "०१२३४५६७८९", "", "09१२३४५६७८९"]);

        let ValidationOutcome::Invalid(messages) = validator().validate_student(&row) else {
            panic!("expected invalid row");
        };
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(messages[0].contains("کد ملی"));
        assert!(messages[1].contains("09१२३४५६७८९"));
    }

    #[test]
    fn column_count_mismatch_lists_both_counts() {
        let row = student_row(&["سارا", "رضایی", "0012345678"]);

        let ValidationOutcome::Invalid(messages) = validator().validate_student(&row) else {
            panic!("expected invalid row");
        };
        assert!(messages[0].contains("14") && messages[0].contains('3'), "{messages:?}");
    }

    #[test]
    fn placeholder_row_is_skipped() {
        let row = student_row(STUDENT_LAYOUT.example);
        assert_eq!(validator().validate_student(&row), ValidationOutcome::Placeholder);

        let row = activity_row(&["Example", "", "", "", "", "", ""]);
        assert_eq!(validator().validate_activity(&row), ValidationOutcome::Placeholder);
    }

    #[test]
    fn guardian_block_needs_name_and_mobile() {
        let mut cells = vec!["سارا", "رضایی", "0012345678", "", "", ""];
        cells.extend(["", "", "dad@example.com", "پدر"]);
        let row = padded_student(&cells);

        let ValidationOutcome::Invalid(messages) = validator().validate_student(&row) else {
            panic!("expected invalid row");
        };
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(messages[0].contains("نام ولی اول"));
        assert!(messages[1].contains("موبایل ولی اول"));
    }

    #[test]
    fn guardians_cannot_share_a_mobile() {
        let row = padded_student(&[
            "سارا", "رضایی", "0012345678", "", "", "", "علی", "09121111111", "", "", "مریم",
            "09121111111", "", "",
        ]);

        let ValidationOutcome::Invalid(messages) = validator().validate_student(&row) else {
            panic!("expected invalid row");
        };
        assert!(messages[0].contains("09121111111"));
    }

    #[test]
    fn guardians_cannot_share_an_email() {
        let row = padded_student(&[
            "سارا", "رضایی", "0012345678", "", "", "", "علی رضایی", "09121111111",
            "fam@example.com", "پدر", "مریم کریمی", "09122222222", "Fam@Example.com", "مادر",
        ]);

        let ValidationOutcome::Invalid(messages) = validator().validate_student(&row) else {
            panic!("expected invalid row");
        };
        assert_eq!(messages.len(), 1, "{messages:?}");
        assert!(messages[0].contains("fam@example.com"));
    }

    #[test]
    fn bad_mobile_relationship_and_date_are_all_reported() {
        let row = padded_student(&[
            "سارا", "رضایی", "0012345678", "not-an-email", "9121234567", "1390/05/12", "علی",
            "09121111111", "", "عمو",
        ]);

        let ValidationOutcome::Invalid(messages) = validator().validate_student(&row) else {
            panic!("expected invalid row");
        };
        assert_eq!(messages.len(), 4, "{messages:?}");
        assert!(messages[0].contains("not-an-email"));
        assert!(messages[1].contains("9121234567"));
        assert!(messages[2].contains("1390/05/12"));
        assert!(messages[3].contains("عمو"));
    }

    #[test]
    fn qualitative_type_requires_evaluation() {
        let row = activity_row(&["0012345678", "فعالیت کلاسی", "کار گروهی", "1403-07-25", "", "", ""]);

        let ValidationOutcome::Invalid(messages) = validator().validate_activity(&row) else {
            panic!("expected invalid row");
        };
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("ارزیابی کیفی"));
        assert!(messages[0].contains("فعالیت کلاسی"));
    }

    #[test]
    fn quantitative_type_requires_score() {
        let row = activity_row(&["0012345678", "امتحان کتبی", "میان‌ترم", "1403-07-25", "", "خوب", ""]);

        let ValidationOutcome::Invalid(messages) = validator().validate_activity(&row) else {
            panic!("expected invalid row");
        };
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("نمره کمی"));
        assert!(messages[0].contains("امتحان کتبی"));
    }

    #[test]
    fn score_range_and_precision() {
        let v = validator();
        assert_eq!(v.score("20"), Some(20.0));
        assert_eq!(v.score("۱۸٫۷۵"), Some(18.75));
        assert_eq!(v.score("0"), Some(0.0));
        assert_eq!(v.score("20.5"), None);
        assert_eq!(v.score("18.125"), None);
        assert_eq!(v.score("-1"), None);
        assert_eq!(v.score("abc"), None);
    }

    #[test]
    fn unknown_type_lists_valid_labels() {
        let row = activity_row(&["0012345678", "گردش علمی", "بازدید", "1403-07-25", "", "", ""]);

        let ValidationOutcome::Invalid(messages) = validator().validate_activity(&row) else {
            panic!("expected invalid row");
        };
        assert!(messages[0].contains("گردش علمی"));
        for kind in ActivityType::ALL {
            assert!(messages[0].contains(kind.label()));
        }
    }

    #[test]
    fn out_of_range_date_is_echoed() {
        let row = activity_row(&["0012345678", "آزمون", "فصل ۱", "1250-01-01", "15", "", ""]);

        let ValidationOutcome::Invalid(messages) = validator().validate_activity(&row) else {
            panic!("expected invalid row");
        };
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("1250-01-01"));
    }

    #[test]
    fn valid_activity_converts_date() {
        let row = activity_row(&["0012345678", "آزمون", "فصل ۱", "۱۴۰۳-۰۷-۲۵", "18.5", "", "توضیح"]);

        let ValidationOutcome::Valid(record) = validator().validate_activity(&row) else {
            panic!("expected valid row");
        };
        assert_eq!(record.activity_type, ActivityType::Quiz);
        assert_eq!(record.date, date!(2024 - 10 - 16));
        assert_eq!(record.jalali_date.to_string(), "1403-07-25");
        assert_eq!(record.score, Some(18.5));
        assert_eq!(record.description.as_deref(), Some("توضیح"));
    }
}
