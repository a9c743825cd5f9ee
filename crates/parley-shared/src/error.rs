use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Empty {0} identifier")]
    EmptyIdentifier(&'static str),

    #[error("Unknown message status: {0}")]
    UnknownStatus(String),

    #[error("Field {field} has unexpected type (expected {expected})")]
    FieldType {
        field: String,
        expected: &'static str,
    },
}
