//! MSBuild project file parser
//!
//! Extracts `<PackageReference>` elements from `.csproj`-style files and
//! rewrites their version attributes in place.
//!
//! Format examples:
//! - Self-closing: `<PackageReference Include="Serilog" Version="3.1.1" />`
//! - With a body:
//!   ```text
//!   <PackageReference Include="Serilog">
//!     <Version>3.1.1</Version>
//!   </PackageReference>
//!   ```
//!
//! Comments are masked before matching so commented-out references are
//! ignored. Edits only touch the bytes of the element being changed.

use std::collections::HashSet;

use regex::{Captures, Regex};
use tracing::debug;

use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::PackageReference;

pub const INCLUDE: &str = "Include";
pub const VERSION: &str = "Version";
pub const VERSION_OVERRIDE: &str = "VersionOverride";

const PROJECT_EXTENSIONS: [&str; 5] = [".csproj", ".fsproj", ".vbproj", ".props", ".targets"];

/// Parser for MSBuild project files
pub struct CsprojParser {
    /// `<PackageReference .../>` or `<PackageReference ...>...</PackageReference>`
    element_re: Regex,
    /// Any opening `<PackageReference` tag
    open_re: Regex,
    /// `name="value"` or `name='value'`
    attribute_re: Regex,
    /// `<Version>...</Version>`
    version_child_re: Regex,
    /// `<VersionOverride>...</VersionOverride>`
    override_child_re: Regex,
    /// `<!-- ... -->`
    comment_re: Regex,
}

impl CsprojParser {
    pub fn new() -> Self {
        Self {
            element_re: Regex::new(
                r"(?s)<PackageReference\b([^>]*?)(?:/>|>(.*?)</PackageReference\s*>)",
            )
            .unwrap(),
            open_re: Regex::new(r"<PackageReference\b").unwrap(),
            attribute_re: Regex::new(r#"([A-Za-z_][\w.:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
                .unwrap(),
            version_child_re: Regex::new(r"(?s)<Version\s*>(.*?)</Version\s*>").unwrap(),
            override_child_re: Regex::new(r"(?s)<VersionOverride\s*>(.*?)</VersionOverride\s*>")
                .unwrap(),
            comment_re: Regex::new(r"(?s)<!--.*?-->").unwrap(),
        }
    }

    /// Copy of `content` with every comment replaced by spaces, keeping
    /// byte offsets stable
    fn mask_comments(&self, content: &str) -> String {
        let mut masked = content.to_string();
        for comment in self.comment_re.find_iter(content) {
            masked.replace_range(comment.range(), &" ".repeat(comment.len()));
        }
        masked
    }

    fn attribute<'a>(&self, attributes: &'a str, name: &str) -> Option<Captures<'a>> {
        self.attribute_re
            .captures_iter(attributes)
            .find(|caps| caps.get(1).is_some_and(|m| m.as_str().eq_ignore_ascii_case(name)))
    }

    fn attribute_value(&self, attributes: &str, name: &str) -> Option<String> {
        let caps = self.attribute(attributes, name)?;
        caps.get(2)
            .or_else(|| caps.get(3))
            .map(|m| unescape(m.as_str()))
    }

    fn child_re(&self, name: &str) -> Option<&Regex> {
        if name.eq_ignore_ascii_case(VERSION) {
            Some(&self.version_child_re)
        } else if name.eq_ignore_ascii_case(VERSION_OVERRIDE) {
            Some(&self.override_child_re)
        } else {
            None
        }
    }

    fn child_value(&self, body: &str, name: &str) -> Option<String> {
        let caps = self.child_re(name)?.captures(body)?;
        caps.get(1).map(|m| unescape(m.as_str().trim()))
    }

    /// Rewrites one attribute of a single `<PackageReference>` element.
    ///
    /// `Some` sets the value (attribute, or the child element when the value
    /// lives there); `None` removes it. Returns the element unchanged when
    /// there is nothing to remove.
    pub fn rewrite_attribute(&self, element: &str, name: &str, value: Option<&str>) -> String {
        let tag_end = element.find('>').map_or(element.len(), |pos| pos + 1);
        let tag = &element[..tag_end];

        if let Some(caps) = self.attribute(tag, name)
            && let Some(whole) = caps.get(0)
        {
            let mut rewritten = element.to_string();
            match value {
                Some(value) => {
                    let quoted = caps.get(2).or_else(|| caps.get(3));
                    if let Some(quoted) = quoted {
                        rewritten.replace_range(quoted.range(), &escape(value));
                    }
                }
                None => {
                    let start = tag[..whole.start()].trim_end().len();
                    rewritten.replace_range(start..whole.end(), "");
                }
            }
            return rewritten;
        }

        if let Some(child_re) = self.child_re(name)
            && let Some(caps) = child_re.captures(&element[tag_end..])
            && let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1))
        {
            let mut rewritten = element.to_string();
            match value {
                Some(value) => {
                    let range = tag_end + inner.start()..tag_end + inner.end();
                    rewritten.replace_range(range, &escape(value));
                }
                None => {
                    let body = &element[tag_end..];
                    let start = tag_end + body[..whole.start()].trim_end().len();
                    rewritten.replace_range(start..tag_end + whole.end(), "");
                }
            }
            return rewritten;
        }

        match value {
            Some(value) => {
                let close = if tag.ends_with("/>") {
                    tag.len() - 2
                } else {
                    tag.len().saturating_sub(1)
                };
                let insert_at = tag[..close].trim_end().len();
                let mut rewritten = element.to_string();
                rewritten.insert_str(insert_at, &format!(" {}=\"{}\"", name, escape(value)));
                rewritten
            }
            None => element.to_string(),
        }
    }
}

impl Default for CsprojParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for CsprojParser {
    fn can_parse(&self, path: &str) -> bool {
        let lower = path.to_ascii_lowercase();
        PROJECT_EXTENSIONS
            .iter()
            .any(|extension| lower.ends_with(extension))
    }

    fn parse(&self, content: &str) -> Result<Vec<PackageReference>, ParseError> {
        let masked = self.mask_comments(content);
        let mut results = Vec::new();
        let mut element_starts = HashSet::new();

        for caps in self.element_re.captures_iter(&masked) {
            let Some(element) = caps.get(0) else {
                continue;
            };
            element_starts.insert(element.start());

            let attributes = caps.get(1).map_or("", |m| m.as_str());
            let body = caps.get(2).map_or("", |m| m.as_str());

            let Some(name) = self
                .attribute_value(attributes, INCLUDE)
                .filter(|name| !name.trim().is_empty())
            else {
                debug!(
                    "Skipping PackageReference without Include at line {}",
                    line_of(content, element.start())
                );
                continue;
            };

            let version = self
                .attribute_value(attributes, VERSION)
                .or_else(|| self.child_value(body, VERSION));
            let version_override = self
                .attribute_value(attributes, VERSION_OVERRIDE)
                .or_else(|| self.child_value(body, VERSION_OVERRIDE));

            results.push(PackageReference {
                name: name.trim().to_string(),
                version,
                version_override,
                start_offset: element.start(),
                end_offset: element.end(),
                line: line_of(content, element.start()),
                column: column_of(content, element.start()),
            });
        }

        if let Some(unclosed) = self
            .open_re
            .find_iter(&masked)
            .find(|open| !element_starts.contains(&open.start()))
        {
            return Err(ParseError::Malformed {
                line: line_of(content, unclosed.start()) + 1,
                reason: "unterminated <PackageReference> element".to_string(),
            });
        }

        Ok(results)
    }
}

fn line_of(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count()
}

fn column_of(content: &str, offset: usize) -> usize {
    offset - content[..offset].rfind('\n').map_or(0, |pos| pos + 1)
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PROJECT: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>net8.0</TargetFramework>
  </PropertyGroup>
  <ItemGroup>
    <PackageReference Include="Serilog" Version="3.1.1" />
    <PackageReference Include="Microsoft.Extensions.Logging" Version="8.0.0" VersionOverride="8.0.1"/>
    <!-- <PackageReference Include="Commented.Out" Version="1.0.0" /> -->
    <PackageReference Include="Newtonsoft.Json">
      <Version>13.0.3</Version>
    </PackageReference>
    <PackageReference Include='Dapper' />
    <PackageReference Update="Central.Only" Version="2.0.0" />
  </ItemGroup>
</Project>
"#;

    #[test]
    fn parse_extracts_package_references() {
        let parser = CsprojParser::new();
        let result = parser.parse(PROJECT).unwrap();

        let summary: Vec<(&str, Option<&str>, Option<&str>)> = result
            .iter()
            .map(|r| {
                (
                    r.name.as_str(),
                    r.version.as_deref(),
                    r.version_override.as_deref(),
                )
            })
            .collect();

        assert_eq!(
            summary,
            vec![
                ("Serilog", Some("3.1.1"), None),
                ("Microsoft.Extensions.Logging", Some("8.0.0"), Some("8.0.1")),
                ("Newtonsoft.Json", Some("13.0.3"), None),
                ("Dapper", None, None),
            ]
        );
    }

    #[test]
    fn parse_records_element_span_and_position() {
        let parser = CsprojParser::new();
        let result = parser.parse(PROJECT).unwrap();

        let serilog = &result[0];
        assert_eq!(
            &PROJECT[serilog.start_offset..serilog.end_offset],
            r#"<PackageReference Include="Serilog" Version="3.1.1" />"#
        );
        assert_eq!(serilog.line, 5);
        assert_eq!(serilog.column, 4);

        let newtonsoft = &result[2];
        assert!(PROJECT[newtonsoft.start_offset..newtonsoft.end_offset].ends_with("</PackageReference>"));
    }

    #[test]
    fn parse_returns_empty_for_project_without_references() {
        let parser = CsprojParser::new();
        let result = parser.parse("<Project><ItemGroup /></Project>").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn parse_rejects_unterminated_element() {
        let parser = CsprojParser::new();
        let content = "<Project>\n  <ItemGroup>\n    <PackageReference Include=\"A\">\n  </ItemGroup>\n</Project>";

        let result = parser.parse(content);

        assert_eq!(
            result,
            Err(ParseError::Malformed {
                line: 3,
                reason: "unterminated <PackageReference> element".to_string()
            })
        );
    }

    #[test]
    fn parse_unescapes_entities() {
        let parser = CsprojParser::new();
        let result = parser
            .parse(r#"<PackageReference Include="A&amp;B" Version="1.0.0" />"#)
            .unwrap();
        assert_eq!(result[0].name, "A&B");
    }

    #[rstest]
    #[case("/repo/src/App/App.csproj", true)]
    #[case("/repo/src/App/App.fsproj", true)]
    #[case("/repo/Directory.Packages.props", true)]
    #[case("/repo/App.CSPROJ", true)]
    #[case("/repo/package.json", false)]
    fn can_parse_project_files(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(CsprojParser::new().can_parse(path), expected);
    }

    #[rstest]
    #[case(
        r#"<PackageReference Include="A" Version="1.0.0" />"#,
        VERSION,
        Some("2.0.0"),
        r#"<PackageReference Include="A" Version="2.0.0" />"#
    )]
    #[case(
        r#"<PackageReference Include="A" />"#,
        VERSION,
        Some("2.0.0"),
        r#"<PackageReference Include="A" Version="2.0.0" />"#
    )]
    #[case(
        r#"<PackageReference Include="A"/>"#,
        VERSION_OVERRIDE,
        Some("2.0.0"),
        r#"<PackageReference Include="A" VersionOverride="2.0.0"/>"#
    )]
    #[case(
        r#"<PackageReference Include="A" Version="1.0.0" PrivateAssets="all" />"#,
        VERSION,
        None,
        r#"<PackageReference Include="A" PrivateAssets="all" />"#
    )]
    #[case(
        r#"<PackageReference Include="A" />"#,
        VERSION,
        None,
        r#"<PackageReference Include="A" />"#
    )]
    #[case(
        "<PackageReference Include=\"A\">\n  <Version>1.0.0</Version>\n</PackageReference>",
        VERSION,
        Some("1.5.0"),
        "<PackageReference Include=\"A\">\n  <Version>1.5.0</Version>\n</PackageReference>"
    )]
    #[case(
        "<PackageReference Include=\"A\">\n  <Version>1.0.0</Version>\n</PackageReference>",
        VERSION,
        None,
        "<PackageReference Include=\"A\">\n</PackageReference>"
    )]
    #[case(
        "<PackageReference Include=\"A\">\n</PackageReference>",
        VERSION,
        Some("1.0.0"),
        "<PackageReference Include=\"A\" Version=\"1.0.0\">\n</PackageReference>"
    )]
    fn rewrite_attribute_edits_only_the_target(
        #[case] element: &str,
        #[case] name: &str,
        #[case] value: Option<&str>,
        #[case] expected: &str,
    ) {
        let parser = CsprojParser::new();
        assert_eq!(parser.rewrite_attribute(element, name, value), expected);
    }
}
