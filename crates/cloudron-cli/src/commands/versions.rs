//! Release resolution.

use std::io::Write;

use cloudron_api::releases;

use crate::error::CliError;
use crate::output::{OutputFormat, ResolvedVersion, VersionList};

/// Handler for `versions`.
pub struct VersionsCommand<'a> {
    format: &'a OutputFormat,
}

impl<'a> VersionsCommand<'a> {
    /// Creates a new versions command handler.
    #[must_use]
    pub const fn new(format: &'a OutputFormat) -> Self {
        Self { format }
    }

    /// List releases, or resolve `selector` to one.
    ///
    /// # Errors
    ///
    /// Returns `UnknownVersion` for selectors that match no release.
    pub fn execute<W: Write>(&self, out: &mut W, selector: Option<&str>) -> Result<(), CliError> {
        match selector {
            Some(selector) => {
                let version = releases::resolve(selector)?;
                self.format.write(
                    out,
                    &ResolvedVersion {
                        selector: selector.to_string(),
                        version: version.to_string(),
                    },
                )
            }
            None => self.format.write(
                out,
                &VersionList {
                    latest: releases::LATEST.to_string(),
                    versions: releases::list().map(str::to_string).collect(),
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;

    #[test]
    fn resolve_latest() {
        let format = OutputFormat::default();
        let mut out = Vec::new();
        VersionsCommand::new(&format)
            .execute(&mut out, Some("latest"))
            .expect("resolve");
        assert_eq!(String::from_utf8(out).expect("utf8"), format!("{}\n", releases::LATEST));
    }

    #[test]
    fn resolve_unknown() {
        let format = OutputFormat::default();
        let err = VersionsCommand::new(&format)
            .execute(&mut Vec::new(), Some("9.9.9"))
            .expect_err("unknown");
        assert_eq!(err.to_string(), "unknown version: 9.9.9");
    }

    #[test]
    fn list_as_json() {
        let format = OutputFormat::new(Format::Json);
        let mut out = Vec::new();
        VersionsCommand::new(&format)
            .execute(&mut out, None)
            .expect("list");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["latest"], releases::LATEST);
        assert_eq!(value["versions"][0], releases::LATEST);
    }
}
