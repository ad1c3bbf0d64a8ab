//! Parser layer
//! - traits.rs: Parser trait definition
//! - types.rs: Common types (PackageReference)
//! - csproj.rs: MSBuild project file parser
//! - project.rs: Loaded project file with edit operations

pub mod csproj;
pub mod project;
pub mod traits;
pub mod types;

pub use csproj::CsprojParser;
pub use project::{ProjectError, ProjectFile};
pub use traits::{ParseError, Parser};
pub use types::PackageReference;
