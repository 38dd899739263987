use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{RecordId, ReviewId, SubjectId};

/// The kind of entity a review targets.
///
/// Only [`SubjectType::User`] reviews feed a reputation. Any other kind is
/// preserved verbatim so it survives a read/write cycle untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubjectType {
    User,
    Other(String),
}

impl SubjectType {
    /// Wire value for user reviews.
    pub const USER: &'static str = "user";

    /// Legacy wire value for user reviews still present in older documents.
    pub const LEGACY_USER: &'static str = "usuario";

    pub fn is_user(&self) -> bool {
        matches!(self, SubjectType::User)
    }

    pub fn as_str(&self) -> &str {
        match self {
            SubjectType::User => Self::USER,
            SubjectType::Other(kind) => kind,
        }
    }
}

impl From<String> for SubjectType {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            Self::USER | Self::LEGACY_USER => SubjectType::User,
            _ => SubjectType::Other(kind),
        }
    }
}

impl From<&str> for SubjectType {
    fn from(kind: &str) -> Self {
        SubjectType::from(kind.to_string())
    }
}

impl From<SubjectType> for String {
    fn from(kind: SubjectType) -> Self {
        match kind {
            SubjectType::User => SubjectType::USER.to_string(),
            SubjectType::Other(kind) => kind,
        }
    }
}

impl std::fmt::Display for SubjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Soft-delete state of a review.
///
/// Encoded on the wire as a nullable `deletedAt` timestamp: `null` or a
/// missing field is [`Deletion::Active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deletion {
    #[default]
    Active,
    Deleted {
        at: DateTime<Utc>,
    },
}

impl Deletion {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Deletion::Deleted { .. })
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Deletion::Active => None,
            Deletion::Deleted { at } => Some(*at),
        }
    }
}

impl From<Option<DateTime<Utc>>> for Deletion {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        match value {
            Some(at) => Deletion::Deleted { at },
            None => Deletion::Active,
        }
    }
}

impl Serialize for Deletion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.deleted_at().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Deletion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Option::<DateTime<Utc>>::deserialize(deserializer).map(Deletion::from)
    }
}

/// A review of a subject, as stored.
///
/// `subject_id`, `subject_type` and `score` are required for a review to be
/// counted, but documents written by other actors may lack them, so they are
/// optional here and checked at the point of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub id: ReviewId,
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
    #[serde(default)]
    pub subject_type: Option<SubjectType>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub visible: bool,
    #[serde(default, rename = "deletedAt")]
    pub deletion: Deletion,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReviewRecord {
    /// Creates a visible, active user review with a fresh id.
    pub fn user_review(subject_id: impl Into<SubjectId>, score: f64) -> Self {
        Self {
            id: ReviewId::generate(),
            subject_id: Some(subject_id.into()),
            subject_type: Some(SubjectType::User),
            score: Some(score),
            visible: true,
            deletion: Deletion::Active,
            created_at: Utc::now(),
            reviewer_id: None,
            comment: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<ReviewId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn deleted_at(mut self, at: DateTime<Utc>) -> Self {
        self.deletion = Deletion::Deleted { at };
        self
    }

    pub fn with_subject_type(mut self, subject_type: impl Into<SubjectType>) -> Self {
        self.subject_type = Some(subject_type.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_reviewer(mut self, reviewer_id: impl Into<String>) -> Self {
        self.reviewer_id = Some(reviewer_id.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_user_review(&self) -> bool {
        self.subject_type.as_ref().is_some_and(SubjectType::is_user)
    }
}

/// Canonical per-subject record carrying the aggregate reputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub id: SubjectId,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub mean_score: f64,
    #[serde(default)]
    pub review_count: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SubjectRecord {
    /// Creates an active subject with no reputation yet.
    pub fn new(id: impl Into<SubjectId>) -> Self {
        Self {
            id: id.into(),
            active: true,
            mean_score: 0.0,
            review_count: 0,
            updated_at: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// New reputation values for a canonical subject record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReputationUpdate {
    pub mean_score: f64,
    pub review_count: u64,
    pub updated_at: DateTime<Utc>,
}

/// A record owned by a subject that mirrors the owner's mean score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedRecord {
    pub id: RecordId,
    pub owner_id: SubjectId,
    #[serde(default)]
    pub owner_mean_score: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl OwnedRecord {
    pub fn new(id: impl Into<RecordId>, owner_id: impl Into<SubjectId>) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            owner_mean_score: None,
            updated_at: None,
        }
    }
}
