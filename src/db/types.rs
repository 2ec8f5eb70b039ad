use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Principal,
    Teacher,
    Student,
    Parent,
}

impl UserRole {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Principal => "principal",
            Self::Teacher => "teacher",
            Self::Student => "student",
            Self::Parent => "parent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "relationshiprole", rename_all = "lowercase")]
pub(crate) enum RelationshipRole {
    Father,
    Mother,
    Guardian,
}

impl RelationshipRole {
    pub(crate) const LABELS: &'static [(&'static str, RelationshipRole)] = &[
        ("پدر", RelationshipRole::Father),
        ("مادر", RelationshipRole::Mother),
        ("سرپرست", RelationshipRole::Guardian),
        ("ولی", RelationshipRole::Guardian),
    ];

    pub(crate) fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::LABELS.iter().find(|(known, _)| *known == label).map(|(_, role)| *role)
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Father => "پدر",
            Self::Mother => "مادر",
            Self::Guardian => "سرپرست",
        }
    }
}

/// Which evaluation an activity type is graded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Evaluation {
    Quantitative,
    Qualitative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "activitytype", rename_all = "snake_case")]
pub(crate) enum ActivityType {
    Quiz,
    WrittenExam,
    OralExam,
    Project,
    ClassActivity,
    Homework,
}

impl ActivityType {
    pub(crate) const ALL: [ActivityType; 6] = [
        ActivityType::Quiz,
        ActivityType::WrittenExam,
        ActivityType::OralExam,
        ActivityType::Project,
        ActivityType::ClassActivity,
        ActivityType::Homework,
    ];

    pub(crate) fn key(self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::WrittenExam => "written_exam",
            Self::OralExam => "oral_exam",
            Self::Project => "project",
            Self::ClassActivity => "class_activity",
            Self::Homework => "homework",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Quiz => "آزمون",
            Self::WrittenExam => "امتحان کتبی",
            Self::OralExam => "امتحان شفاهی",
            Self::Project => "پروژه",
            Self::ClassActivity => "فعالیت کلاسی",
            Self::Homework => "تکلیف",
        }
    }

    pub(crate) fn evaluation(self) -> Evaluation {
        match self {
            Self::Quiz | Self::WrittenExam | Self::OralExam | Self::Project => {
                Evaluation::Quantitative
            }
            Self::ClassActivity | Self::Homework => Evaluation::Qualitative,
        }
    }

    pub(crate) fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|kind| kind.label() == label || kind.key() == label)
    }
}
