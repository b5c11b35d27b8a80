mod queue;

pub use queue::SqliteQueue;
