pub mod baseline;
pub mod collaborators;
pub mod defs;
pub mod empty;
pub mod state;

pub use baseline::MemoryStore;
pub use collaborators::{Archiver, FeedItemConverter, Summarizer};
pub use defs::*;
pub use empty::Noop;
pub use state::{Store, StoreError, StoreResult};
