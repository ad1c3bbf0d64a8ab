//! Parser trait definition

use crate::parser::types::PackageReference;

/// Trait for parsing project files
pub trait Parser {
    /// Check if this parser can handle the given path
    fn can_parse(&self, path: &str) -> bool;

    /// Parse the content and extract package references
    fn parse(&self, content: &str) -> Result<Vec<PackageReference>, ParseError>;
}

/// Error type for parsing operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Element that is opened but never closed
    #[error("Malformed project file at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
