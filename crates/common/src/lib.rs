//! Shared identifier types used across the reputation workspace.

mod types;

pub use types::{RecordId, ReviewId, SubjectId};
