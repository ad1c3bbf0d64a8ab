//! Project file fixtures

use std::path::{Path, PathBuf};

/// Writes `App.csproj` with one `<PackageReference>` per entry
pub fn write_project(dir: &Path, references: &[(&str, Option<&str>)]) -> PathBuf {
    let mut content = String::from(
        "<Project Sdk=\"Microsoft.NET.Sdk\">\n  <PropertyGroup>\n    <TargetFramework>netstandard2.0</TargetFramework>\n  </PropertyGroup>\n  <ItemGroup>\n",
    );
    for (name, version) in references {
        match version {
            Some(version) => content.push_str(&format!(
                "    <PackageReference Include=\"{}\" Version=\"{}\" />\n",
                name, version
            )),
            None => content.push_str(&format!("    <PackageReference Include=\"{}\" />\n", name)),
        }
    }
    content.push_str("  </ItemGroup>\n</Project>\n");

    let path = dir.join("App.csproj");
    std::fs::write(&path, content).unwrap();
    path
}
