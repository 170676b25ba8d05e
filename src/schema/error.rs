use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("Invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("Schema '{entity}' has a conditional rule on undeclared field '{field}'")]
    UndeclaredField { entity: String, field: String },

    #[error("Schema '{entity}' declares field '{field}' more than once")]
    DuplicateField { entity: String, field: String },
}
