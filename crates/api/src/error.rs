/// Error type handed across collaborator boundaries
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoordinateParseError {
    #[error("expected 'group:name:version[:classifier]', got '{0}'")]
    Malformed(String),
    #[error("empty {field} in coordinate '{input}'")]
    EmptyField { field: &'static str, input: String },
}
