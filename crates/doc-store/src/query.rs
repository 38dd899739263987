use crate::SubjectId;

/// Ordering of reviews returned by a [`ReviewQuery`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReviewOrder {
    /// No particular order.
    #[default]
    Unordered,
    /// Most recently created first.
    NewestFirst,
}

/// Query for the user reviews of one subject.
///
/// Stores only ever return reviews whose `subjectType` is user. Whether a
/// returned review actually counts toward a reputation is decided by the
/// caller, not the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQuery {
    /// The reviewed subject.
    pub subject_id: SubjectId,

    /// Result ordering.
    pub order: ReviewOrder,

    /// Maximum number of reviews to return.
    pub limit: Option<usize>,
}

impl ReviewQuery {
    /// Creates a query for all user reviews of a subject.
    pub fn for_subject(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            order: ReviewOrder::Unordered,
            limit: None,
        }
    }

    /// Orders results most recent first.
    pub fn newest_first(mut self) -> Self {
        self.order = ReviewOrder::NewestFirst;
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Keyset page request over subject ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Return ids strictly greater than this one.
    pub after: Option<SubjectId>,

    /// Maximum page size.
    pub limit: usize,
}

impl PageRequest {
    /// Requests the first page.
    pub fn first(limit: usize) -> Self {
        Self { after: None, limit }
    }

    /// Requests the page following `cursor`.
    pub fn after(cursor: SubjectId, limit: usize) -> Self {
        Self {
            after: Some(cursor),
            limit,
        }
    }
}

/// A page of results with the cursor for the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,

    /// `None` when this is the last page.
    pub next: Option<SubjectId>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}
