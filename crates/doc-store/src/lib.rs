pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use common::{RecordId, ReviewId, SubjectId};
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::{Page, PageRequest, ReviewOrder, ReviewQuery};
pub use record::{Deletion, OwnedRecord, ReputationUpdate, ReviewRecord, SubjectRecord, SubjectType};
pub use store::{BatchWrite, DEFAULT_MAX_BATCH_SIZE, DocumentStore, DocumentStoreExt, WriteBatch};
