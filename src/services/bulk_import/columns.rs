/// Typed identifier of every column an import file can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ColumnId {
    FirstName,
    LastName,
    NationalId,
    Email,
    Mobile,
    BirthDate,
    GuardianName(Guardian),
    GuardianMobile(Guardian),
    GuardianEmail(Guardian),
    GuardianRelationship(Guardian),
    StudentNationalId,
    ActivityType,
    Title,
    ActivityDate,
    QuantitativeScore,
    QualitativeEvaluation,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Guardian {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Column {
    pub(crate) id: ColumnId,
    pub(crate) label: &'static str,
    pub(crate) required: bool,
}

const fn column(id: ColumnId, label: &'static str, required: bool) -> Column {
    Column { id, label, required }
}

/// Ordered column set of one import kind. Position in `columns` is the
/// fallback offset used when a header label cannot be matched.
#[derive(Debug)]
pub(crate) struct ColumnLayout {
    pub(crate) kind: &'static str,
    pub(crate) columns: &'static [Column],
    pub(crate) example: &'static [&'static str],
}

impl ColumnLayout {
    pub(crate) fn len(&self) -> usize {
        self.columns.len()
    }

    pub(crate) fn position(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|column| column.id == id)
    }

    pub(crate) fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|column| column.id == id)
    }

    /// Header title as written in templates, with the `*` marker on required columns.
    pub(crate) fn header(&self, column: &Column) -> String {
        if column.required {
            format!("{}*", column.label)
        } else {
            column.label.to_string()
        }
    }

    pub(crate) fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|column| self.header(column)).collect()
    }
}

pub(crate) static STUDENT_LAYOUT: ColumnLayout = ColumnLayout {
    kind: "students",
    columns: &[
        column(ColumnId::FirstName, "نام", true),
        column(ColumnId::LastName, "نام خانوادگی", true),
        column(ColumnId::NationalId, "کد ملی", true),
        column(ColumnId::Email, "ایمیل", false),
        column(ColumnId::Mobile, "شماره موبایل", false),
        column(ColumnId::BirthDate, "تاریخ تولد", false),
        column(ColumnId::GuardianName(Guardian::First), "نام ولی اول", false),
        column(ColumnId::GuardianMobile(Guardian::First), "موبایل ولی اول", false),
        column(ColumnId::GuardianEmail(Guardian::First), "ایمیل ولی اول", false),
        column(ColumnId::GuardianRelationship(Guardian::First), "نسبت ولی اول", false),
        column(ColumnId::GuardianName(Guardian::Second), "نام ولی دوم", false),
        column(ColumnId::GuardianMobile(Guardian::Second), "موبایل ولی دوم", false),
        column(ColumnId::GuardianEmail(Guardian::Second), "ایمیل ولی دوم", false),
        column(ColumnId::GuardianRelationship(Guardian::Second), "نسبت ولی دوم", false),
    ],
    example: &[
        "مثال",
        "محمدی",
        "0012345678",
        "student@example.com",
        "09121234567",
        "1390-05-12",
        "علی محمدی",
        "09121111111",
        "father@example.com",
        "پدر",
        "زهرا احمدی",
        "09122222222",
        "",
        "مادر",
    ],
};

pub(crate) static ACTIVITY_LAYOUT: ColumnLayout = ColumnLayout {
    kind: "activities",
    columns: &[
        column(ColumnId::StudentNationalId, "کد ملی دانش\u{200c}آموز", true),
        column(ColumnId::ActivityType, "نوع فعالیت", true),
        column(ColumnId::Title, "عنوان", true),
        column(ColumnId::ActivityDate, "تاریخ", true),
        column(ColumnId::QuantitativeScore, "نمره کمی", false),
        column(ColumnId::QualitativeEvaluation, "ارزیابی کیفی", false),
        column(ColumnId::Description, "توضیحات", false),
    ],
    example: &["مثال", "آزمون", "آزمون فصل اول", "1403-07-25", "18.5", "", ""],
};

/// Header comparison form: trimmed, required marker dropped, ZWNJ and
/// whitespace runs collapsed to one space.
pub(crate) fn normalize_label(label: &str) -> String {
    let label = label.trim().trim_end_matches('*').trim();
    label
        .split(|c: char| c.is_whitespace() || c == '\u{200c}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
