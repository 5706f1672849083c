//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use cloudron_api::App;
use cloudron_config::BuildRecord;
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Installed apps.
#[derive(Debug, Clone, Serialize)]
pub struct AppList {
    /// Apps as reported by the server.
    pub apps: Vec<App>,
}

impl TableDisplay for AppList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.apps.is_empty() {
            writeln!(writer, "No apps installed")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<36}  {:<20}  {:<28}  {:<14}  {:<10}",
            "ID", "LOCATION", "MANIFEST", "STATE", "HEALTH"
        )?;
        writeln!(writer, "{}", "─".repeat(116))?;

        for app in &self.apps {
            writeln!(
                writer,
                "{:<36}  {:<20}  {:<28}  {:<14}  {:<10}",
                app.id,
                truncate(&app.location, 20),
                truncate(app.manifest_id(), 28),
                app.installation_state,
                app.health.as_deref().unwrap_or("-"),
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} app(s)", self.apps.len())?;
        Ok(())
    }
}

/// One app in detail.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct AppDetail {
    /// The app.
    pub app: App,
}

impl TableDisplay for AppDetail {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let app = &self.app;
        let manifest = app.manifest.as_ref();
        writeln!(writer, "App {}", app.id)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(
            writer,
            "Title:       {}",
            manifest.and_then(|m| m.title.as_deref()).unwrap_or("-")
        )?;
        writeln!(writer, "Manifest:    {}", app.manifest_id())?;
        writeln!(
            writer,
            "Version:     {}",
            manifest.and_then(|m| m.version.as_deref()).unwrap_or("-")
        )?;
        writeln!(writer, "Location:    {}", app.location)?;
        if let Some(fqdn) = &app.fqdn {
            writeln!(writer, "Domain:      {fqdn}")?;
        }
        writeln!(writer)?;
        writeln!(writer, "State:       {}", app.installation_state)?;
        if let Some(progress) = &app.installation_progress {
            writeln!(writer, "Progress:    {progress}")?;
        }
        writeln!(writer, "Run state:   {}", app.run_state.as_deref().unwrap_or("-"))?;
        writeln!(writer, "Health:      {}", app.health.as_deref().unwrap_or("-"))?;
        Ok(())
    }
}

/// Build history of a project.
#[derive(Debug, Clone, Serialize)]
pub struct BuildList {
    /// Manifest id the builds belong to.
    pub project: String,
    /// Builds, oldest first.
    pub builds: Vec<BuildRecord>,
}

impl TableDisplay for BuildList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.builds.is_empty() {
            writeln!(writer, "No builds for {}", self.project)?;
            return Ok(());
        }

        writeln!(writer, "{:<36}  {:<19}  {}", "ID", "SUBMITTED", "IMAGE")?;
        writeln!(writer, "{}", "─".repeat(96))?;
        for build in &self.builds {
            writeln!(
                writer,
                "{:<36}  {:<19}  {}",
                build.id,
                build.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                build.docker_image.as_deref().unwrap_or("-"),
            )?;
        }
        Ok(())
    }
}

/// Known releases.
#[derive(Debug, Clone, Serialize)]
pub struct VersionList {
    /// Release `latest` resolves to.
    pub latest: String,
    /// Releases, newest first.
    pub versions: Vec<String>,
}

impl TableDisplay for VersionList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for version in &self.versions {
            if *version == self.latest {
                writeln!(writer, "{version}  (latest)")?;
            } else {
                writeln!(writer, "{version}")?;
            }
        }
        Ok(())
    }
}

/// A resolved release selector.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedVersion {
    /// Selector as given.
    pub selector: String,
    /// Pinned release.
    pub version: String,
}

impl TableDisplay for ResolvedVersion {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.version)?;
        Ok(())
    }
}

/// Shorten `s` to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudron_api::types::ManifestSummary;

    fn app(id: &str, location: &str) -> App {
        App {
            id: id.into(),
            location: location.into(),
            manifest: Some(ManifestSummary {
                id: "io.example.blog".into(),
                version: Some("1.2.0".into()),
                title: Some("Blog".into()),
            }),
            installation_state: "installed".into(),
            health: Some("healthy".into()),
            ..App::default()
        }
    }

    fn render<T: Serialize + TableDisplay>(format: Format, value: &T) -> String {
        let mut buf = Vec::new();
        OutputFormat::new(format)
            .write(&mut buf, value)
            .expect("write");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn app_list_table() {
        let out = render(
            Format::Table,
            &AppList {
                apps: vec![app("a1", "blog"), app("a2", "wiki")],
            },
        );
        assert!(out.starts_with("ID"));
        assert!(out.contains("io.example.blog"));
        assert!(out.contains("wiki"));
        assert!(out.contains("Total: 2 app(s)"));
    }

    #[test]
    fn app_list_empty() {
        let out = render(Format::Table, &AppList { apps: vec![] });
        assert_eq!(out, "No apps installed\n");
    }

    #[test]
    fn app_detail_json_is_the_app() {
        let out = render(Format::Json, &AppDetail { app: app("a1", "blog") });
        let value: serde_json::Value = serde_json::from_str(&out).expect("json");
        assert_eq!(value["id"], "a1");
        assert_eq!(value["installationState"], "installed");
    }

    #[test]
    fn app_detail_table() {
        let out = render(Format::Table, &AppDetail { app: app("a1", "blog") });
        assert!(out.contains("Title:       Blog"));
        assert!(out.contains("Version:     1.2.0"));
        assert!(out.contains("Run state:   -"));
    }

    #[test]
    fn build_list_table() {
        let mut done = BuildRecord::submitted("b2");
        done.docker_image = Some("registry/blog:2".into());
        let out = render(
            Format::Table,
            &BuildList {
                project: "io.example.blog".into(),
                builds: vec![BuildRecord::submitted("b1"), done],
            },
        );
        assert!(out.contains("b1"));
        assert!(out.contains("registry/blog:2"));
    }

    #[test]
    fn version_list_marks_latest() {
        let out = render(
            Format::Table,
            &VersionList {
                latest: "0.0.2".into(),
                versions: vec!["0.0.2".into(), "0.0.1".into()],
            },
        );
        assert_eq!(out, "0.0.2  (latest)\n0.0.1\n");
    }

    #[test]
    fn truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_multibyte() {
        assert_eq!(truncate("ääääää", 5), "ää...");
    }
}
