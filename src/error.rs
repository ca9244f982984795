use thiserror::Error;

/// Errors raised by the tabular pipeline.
///
/// `Schema` means the input table had the wrong shape (a required column
/// is missing), while `Parse` and `Validation` mean a value inside an
/// otherwise well-shaped table was unusable. Callers can match on the
/// variant to decide whether to fix their configuration or reject the
/// supplied data.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("column '{column}' not found in {table}")]
    Schema { table: &'static str, column: String },

    #[error("failed to parse {what} ({context}): {message}")]
    Parse {
        what: &'static str,
        context: String,
        message: String,
    },

    #[error("{0}")]
    Validation(String),
}

impl PipelineError {
    pub fn schema(table: &'static str, column: impl Into<String>) -> Self {
        PipelineError::Schema {
            table,
            column: column.into(),
        }
    }

    pub fn parse(what: &'static str, context: impl Into<String>, message: impl ToString) -> Self {
        PipelineError::Parse {
            what,
            context: context.into(),
            message: message.to_string(),
        }
    }
}
