//! Project file loaded into memory for reading and editing

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::parser::csproj::{CsprojParser, VERSION, VERSION_OVERRIDE};
use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::PackageReference;

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("No PackageReference for '{0}'")]
    UnknownPackage(String),
}

/// A project file and its parsed references.
///
/// Every edit rewrites only the affected element and re-parses, so offsets
/// in [`ProjectFile::references`] always match [`ProjectFile::content`].
pub struct ProjectFile {
    path: PathBuf,
    content: String,
    references: Vec<PackageReference>,
    parser: CsprojParser,
}

impl ProjectFile {
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let content = fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_content(path, content)
    }

    pub fn from_content(path: &Path, content: String) -> Result<Self, ProjectError> {
        let parser = CsprojParser::new();
        if !parser.can_parse(&path.to_string_lossy()) {
            warn!("{} does not look like an MSBuild project file", path.display());
        }

        let references = parser.parse(&content)?;
        debug!(
            "Parsed {} package references from {}",
            references.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            content,
            references,
            parser,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// References in document order
    pub fn references(&self) -> &[PackageReference] {
        &self.references
    }

    /// Case-insensitive lookup by package id
    pub fn find(&self, name: &str) -> Option<&PackageReference> {
        self.references.iter().find(|r| r.matches_name(name))
    }

    /// Sets or removes `Version`.
    ///
    /// Setting is a no-op while a `VersionOverride` is present. Returns
    /// whether the content changed.
    pub fn set_version(&mut self, name: &str, value: Option<&str>) -> Result<bool, ProjectError> {
        let reference = self.require(name)?;
        if value.is_some() && reference.version_override.is_some() {
            debug!("{} has a VersionOverride, leaving Version untouched", name);
            return Ok(false);
        }
        self.edit_element(name, |parser, element| {
            parser.rewrite_attribute(element, VERSION, value)
        })
    }

    /// Sets or removes `VersionOverride`; setting also drops `Version`
    pub fn set_version_override(
        &mut self,
        name: &str,
        value: Option<&str>,
    ) -> Result<bool, ProjectError> {
        self.require(name)?;
        self.edit_element(name, |parser, element| {
            let rewritten = parser.rewrite_attribute(element, VERSION_OVERRIDE, value);
            match value {
                Some(_) => parser.rewrite_attribute(&rewritten, VERSION, None),
                None => rewritten,
            }
        })
    }

    /// Removes the whole element, including its line when it stands alone
    pub fn remove_package_reference(&mut self, name: &str) -> Result<(), ProjectError> {
        let reference = self.require(name)?;
        let (start, end) = line_extent(&self.content, reference.start_offset, reference.end_offset);

        let mut content = self.content.clone();
        content.replace_range(start..end, "");
        self.replace_content(content)?;

        info!("Removed PackageReference {}", name);
        Ok(())
    }

    pub fn save(&self) -> Result<(), ProjectError> {
        fs::write(&self.path, &self.content).map_err(|source| ProjectError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!("Saved {}", self.path.display());
        Ok(())
    }

    fn require(&self, name: &str) -> Result<&PackageReference, ProjectError> {
        self.find(name)
            .ok_or_else(|| ProjectError::UnknownPackage(name.to_string()))
    }

    fn edit_element<E>(&mut self, name: &str, edit: E) -> Result<bool, ProjectError>
    where
        E: FnOnce(&CsprojParser, &str) -> String,
    {
        let reference = self.require(name)?;
        let range = reference.start_offset..reference.end_offset;

        let element = &self.content[range.clone()];
        let rewritten = edit(&self.parser, element);
        if rewritten == element {
            return Ok(false);
        }

        let mut content = self.content.clone();
        content.replace_range(range, &rewritten);
        self.replace_content(content)?;
        Ok(true)
    }

    fn replace_content(&mut self, content: String) -> Result<(), ProjectError> {
        self.references = self.parser.parse(&content)?;
        self.content = content;
        Ok(())
    }
}

/// Widens `start..end` to whole lines when the element is alone on them
fn line_extent(content: &str, start: usize, end: usize) -> (usize, usize) {
    let line_start = content[..start].rfind('\n').map_or(0, |pos| pos + 1);
    let line_end = content[end..]
        .find('\n')
        .map_or(content.len(), |pos| end + pos + 1);

    let alone = content[line_start..start].trim().is_empty()
        && content[end..line_end].trim().is_empty();
    if alone {
        (line_start, line_end)
    } else {
        (start, end)
    }
}
