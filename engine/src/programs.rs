//! Installed-programs report.
//!
//! Lists the executables reachable through `PATH` so the user knows what to
//! reinstall on the new machine. The report is a markdown file,
//! `installed_programs.md`, written to a directory of the caller's choice.

use std::collections::HashSet;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::EngineError;

pub const REPORT_FILE_NAME: &str = "installed_programs.md";

/// One program found on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    pub name: String,
    /// Directory the program was found in
    pub location: Option<PathBuf>,
}

#[cfg(windows)]
fn is_program(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
}

#[cfg(unix)]
fn is_program(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Programs in the directories of a `PATH`-style list, first occurrence of
/// each name wins. Unreadable directories are skipped.
pub fn scan_path_programs(path_list: &OsStr) -> Vec<ProgramInfo> {
    let mut seen = HashSet::new();
    let mut programs = Vec::new();

    for dir in env::split_paths(path_list) {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "skipping PATH entry");
                continue;
            }
        };
        let mut names: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        names.sort();

        for path in names {
            if !is_program(&path) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if seen.insert(name.to_string()) {
                programs.push(ProgramInfo {
                    name: name.to_string(),
                    location: Some(dir.clone()),
                });
            }
        }
    }
    programs
}

/// Programs reachable through this process's `PATH`.
pub fn scan_installed_programs() -> Vec<ProgramInfo> {
    env::var_os("PATH")
        .map(|path| scan_path_programs(&path))
        .unwrap_or_default()
}

pub fn render_report(programs: &[ProgramInfo]) -> String {
    let mut lines = vec!["# Installed Programs".to_string(), String::new()];
    for program in programs {
        let mut line = format!("- **{}**", program.name);
        if let Some(location) = &program.location {
            line.push_str(&format!(" - {}", location.display()));
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Write the report into `output_dir`, creating it if needed.
pub fn generate_report(output_dir: &Path, programs: &[ProgramInfo]) -> Result<PathBuf, EngineError> {
    fs::create_dir_all(output_dir).map_err(|e| EngineError::DirectoryCreationFailed {
        path: output_dir.to_path_buf(),
        source: e,
    })?;
    let path = output_dir.join(REPORT_FILE_NAME);
    fs::write(&path, render_report(programs)).map_err(|e| EngineError::write(&path, e))?;
    info!(path = %path.display(), programs = programs.len(), "installed programs report saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn make_program(dir: &Path, name: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(windows)]
    fn make_program(dir: &Path, name: &str) {
        fs::write(dir.join(format!("{}.exe", name)), b"MZ").unwrap();
    }

    #[test]
    fn test_scan_finds_programs_once() {
        let first = tempfile::tempdir().expect("Failed to create temp dir");
        let second = tempfile::tempdir().expect("Failed to create temp dir");
        make_program(first.path(), "tool");
        make_program(second.path(), "tool");
        make_program(second.path(), "other");
        fs::write(first.path().join("notes.txt"), b"not a program").unwrap();

        let path_list = env::join_paths([
            first.path().to_path_buf(),
            PathBuf::from("/definitely/missing/dir"),
            second.path().to_path_buf(),
        ])
        .unwrap();
        let programs = scan_path_programs(&path_list);

        let names: Vec<&str> = programs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["tool", "other"]);
        assert_eq!(programs[0].location.as_deref(), Some(first.path()));
    }

    #[test]
    fn test_render_report() {
        let report = render_report(&[
            ProgramInfo {
                name: "git".to_string(),
                location: Some(PathBuf::from("/usr/bin")),
            },
            ProgramInfo {
                name: "local".to_string(),
                location: None,
            },
        ]);
        assert_eq!(
            report,
            "# Installed Programs\n\n- **git** - /usr/bin\n- **local**"
        );
    }

    #[test]
    fn test_generate_report_writes_markdown() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let out = temp_dir.path().join("reports");

        let path = generate_report(&out, &[]).expect("Failed to write report");

        assert_eq!(path, out.join(REPORT_FILE_NAME));
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Installed Programs\n");
    }
}
