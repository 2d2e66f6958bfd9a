//! Safety checks for files the CLI writes.
//!
//! A report is plain JSON written next to the database; these checks keep a
//! mistyped `--output` from clobbering the database or an input dump.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that a report output path is safe to overwrite.
///
/// Checks:
/// - Output must have a `.json` extension
/// - Output cannot be the same as any of the provided source paths
pub fn validate_output_path(output: &Path, source_paths: &[&Path]) -> Result<()> {
    let is_json = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if !is_json {
        bail!(
            "Safety check failed: report output '{}' must end in .json",
            output.display()
        );
    }

    for source in source_paths {
        if output == *source {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}
