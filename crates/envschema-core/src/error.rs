use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid rule for variable '{variable}': {message}")]
    InvalidSchema { variable: String, message: String },

    #[error("Schema must be a mapping of variable names to rules, got {0}")]
    NotAMapping(String),
}
