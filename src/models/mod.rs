pub mod candidate;
pub mod record;

pub use candidate::{CandidateFile, FileTag, ARCHIVE_EXT, DONE_MARKER};
pub use record::LedgerRecord;
