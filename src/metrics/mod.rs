pub mod analytics;
pub mod appwrite;
pub mod memory;
pub mod model;
pub mod repo;
pub mod sqlite;

pub use analytics::{AnalyticsOutcome, SearchAnalytics};
pub use appwrite::AppwriteRepository;
pub use memory::MemoryRepository;
pub use model::*;
pub use repo::*;
pub use sqlite::SqliteRepository;
