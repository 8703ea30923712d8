//! Restore script generation.
//!
//! After a migration the CLI can write a PowerShell script that copies every
//! transferred file from its backup location back to where it came from, and
//! lists the programs that need reinstalling by hand.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::EngineError;
use crate::fs_ops::{ensure_parent_dir_exists, FilePair};
use crate::programs::ProgramInfo;

const HEADER: &[&str] = &["# WinMigrate Restore Script", "$ErrorActionPreference = 'Stop'"];

/// Quote `path` as a PowerShell double-quoted string.
fn ps_quote(path: &Path) -> String {
    let mut quoted = String::from("\"");
    for c in path.display().to_string().chars() {
        if matches!(c, '`' | '"' | '$') {
            quoted.push('`');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Render the script restoring each pair's destination (the backup) onto its
/// source (the original location).
pub fn render_restore_script(pairs: &[FilePair], programs: &[ProgramInfo]) -> String {
    let mut lines: Vec<String> = HEADER.iter().map(|l| l.to_string()).collect();

    let mut last_parent: Option<&Path> = None;
    for pair in pairs {
        if let Some(parent) = pair.source.parent().filter(|p| !p.as_os_str().is_empty()) {
            if last_parent != Some(parent) {
                lines.push(format!(
                    "New-Item -ItemType Directory -Force -Path {} | Out-Null",
                    ps_quote(parent)
                ));
                last_parent = Some(parent);
            }
        }
        lines.push(format!(
            "Copy-Item -Path {} -Destination {} -Force",
            ps_quote(&pair.destination),
            ps_quote(&pair.source)
        ));
    }

    if !programs.is_empty() {
        lines.push(String::new());
        lines.push("# Programs to reinstall".to_string());
        lines.push("Write-Host \"Programs found on the old machine:\"".to_string());
        for program in programs {
            let name = ps_quote(Path::new(&program.name));
            // Strip the surrounding quotes to embed the name in a larger string.
            let name = &name[1..name.len() - 1];
            lines.push(format!("Write-Host \"  - {}\"", name));
        }
    }

    lines.join("\n")
}

/// Write the restore script to `output` and return its path.
pub fn write_restore_script(
    pairs: &[FilePair],
    programs: &[ProgramInfo],
    output: &Path,
) -> Result<PathBuf, EngineError> {
    ensure_parent_dir_exists(output)?;
    fs::write(output, render_restore_script(pairs, programs))
        .map_err(|e| EngineError::write(output, e))?;
    info!(path = %output.display(), files = pairs.len(), "restore script saved");
    Ok(output.to_path_buf())
}
