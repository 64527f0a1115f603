use thiserror::Error;

/// Errors that abort a macro computation or reject a single input value.
///
/// Per-ingredient resolution problems are never represented here; they are
/// reported on the ingredient row instead (see `recipe_aggregator::RowStatus`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MacroError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid input on ingredient line {index} ('{name}'): {reason}")]
    InvalidLine {
        index: usize,
        name: String,
        reason: String,
    },
}

impl MacroError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        MacroError::InvalidInput(reason.into())
    }

    /// Attach the position and name of the offending ingredient line.
    pub fn at_line(self, index: usize, name: &str) -> Self {
        match self {
            MacroError::InvalidInput(reason) => MacroError::InvalidLine {
                index,
                name: name.to_string(),
                reason,
            },
            other => other,
        }
    }
}

pub type MacroResult<T> = Result<T, MacroError>;
