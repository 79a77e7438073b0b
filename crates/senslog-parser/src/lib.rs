pub mod errors;
pub mod filename;
pub mod formats;
pub mod model;

pub use errors::TableError;
pub use filename::{extract_metadata, SESSION_HOURS};
pub use formats::{HeaderColumn, MultiHeaderTable};
pub use model::{FilenameMetadata, LongRecord, ParameterKey, RecordSource, PLACEHOLDER};
