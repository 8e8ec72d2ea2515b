mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryRecordRepository;
pub use sqlite::SqliteRecordRepository;
pub use traits::{RecordRepository, RepositoryCapabilities};
