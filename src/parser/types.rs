//! Common types for parsers

/// One `<PackageReference>` element of a project file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    /// Package id from the `Include` attribute
    pub name: String,
    /// `Version` attribute or child element
    pub version: Option<String>,
    /// `VersionOverride` attribute or child element
    pub version_override: Option<String>,
    /// Byte offset of the element in the source (start)
    pub start_offset: usize,
    /// Byte offset of the element in the source (end)
    pub end_offset: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed)
    pub column: usize,
}

impl PackageReference {
    /// Version used for lookups; an override wins over the declared version
    pub fn effective_version(&self) -> Option<&str> {
        self.version_override
            .as_deref()
            .or(self.version.as_deref())
    }

    /// First dotted segment of the name, capitalized (`microsoft.Extensions` -> `Microsoft`)
    pub fn vendor(&self) -> String {
        let segment = self.name.split('.').next().unwrap_or_default();
        let mut chars = segment.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}
