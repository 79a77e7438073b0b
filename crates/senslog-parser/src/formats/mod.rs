mod common;
mod multi_header;

pub use multi_header::{parse_header, retain_parameter_columns, HeaderColumn, MultiHeaderTable};

pub(crate) use common::{parse_timestamp, strip_trailing_delimiters};
