use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("file is missing header row {row_index} ({label})")]
    MissingHeader { row_index: usize, label: &'static str },

    #[error("CSV error on line {line_index}: {source}")]
    Csv {
        line_index: usize,
        #[source]
        source: csv::Error,
    },

    #[error("data row {line_index} invalid: {message}")]
    DataRow { line_index: usize, message: String },

    #[error("delimiter {0:?} cannot be used as a field separator")]
    InvalidDelimiter(char),
}
