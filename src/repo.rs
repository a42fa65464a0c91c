/*
 * aurbump - Automated AUR package updater for upstream GitHub releases.
 * Copyright (C) 2025  aurbump contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! AUR package repository operations.
//!
//! Clone, dirtiness check, commit and push all shell out to `git`;
//! `.SRCINFO` generation shells out to `makepkg`. PKGBUILD metadata is read
//! with a line-oriented `key = value` scan, which is enough for the
//! `pkgver`/`pkgrel` fields the reconciler needs.

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{AurbumpError, AurbumpResult};

/// SSH URL base for AUR package repositories
pub const AUR_SSH_BASE: &str = "ssh://aur@aur.archlinux.org";

/// Clone URL for a package name
pub fn clone_url(name: &str) -> String {
    format!("{}/{}.git", AUR_SSH_BASE, name)
}

/// Verify the external tools the pipeline shells out to are present
pub fn ensure_tools() -> AurbumpResult<()> {
    for tool in ["git", "makepkg"] {
        which::which(tool).map_err(|_| {
            AurbumpError::repository(tool, "required tool not found in PATH")
        })?;
    }
    Ok(())
}

/// A checked-out AUR package repository
#[derive(Debug)]
pub struct PkgRepo {
    dir: PathBuf,
}

impl PkgRepo {
    /// Clone the package repository fresh, deleting any prior clone
    pub fn clone_fresh(url: &str, dest: &Path) -> AurbumpResult<Self> {
        if dest.exists() {
            tracing::debug!(path = %dest.display(), "removing existing clone");
            fs::remove_dir_all(dest).map_err(|e| {
                AurbumpError::repository_io(
                    dest.display().to_string(),
                    "cannot remove existing clone",
                    e,
                )
            })?;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AurbumpError::repository_io(
                    parent.display().to_string(),
                    "cannot create build directory",
                    e,
                )
            })?;
        }

        let output = Command::new("git")
            .arg("clone")
            .arg(url)
            .arg(dest)
            .output()
            .map_err(|e| AurbumpError::repository_io(url, "cannot run git", e))?;
        if !output.status.success() {
            return Err(AurbumpError::repository(
                url,
                format!("clone failed: {}", String::from_utf8_lossy(&output.stderr).trim()),
            ));
        }

        Ok(Self {
            dir: dest.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the working tree differs from the cloned state.
    ///
    /// Untracked files count as dirty, which is what makes a first render of
    /// a brand-new package register as a change.
    pub fn is_dirty(&self) -> AurbumpResult<bool> {
        let output = self.git(&["status", "--porcelain"])?;
        Ok(!output.trim().is_empty())
    }

    /// Stage everything and commit
    pub fn commit_all(&self, message: &str) -> AurbumpResult<()> {
        self.git(&["add", "."])?;
        self.git(&["commit", "-m", message])?;
        Ok(())
    }

    /// Push to the default remote
    pub fn push(&self) -> AurbumpResult<()> {
        self.git(&["push"])?;
        Ok(())
    }

    fn git(&self, args: &[&str]) -> AurbumpResult<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| {
                AurbumpError::repository_io(self.dir.display().to_string(), "cannot run git", e)
            })?;
        if !output.status.success() {
            return Err(AurbumpError::repository(
                self.dir.display().to_string(),
                format!(
                    "git {} failed: {}",
                    args.first().unwrap_or(&""),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parsed PKGBUILD variables
#[derive(Debug, Clone, Default)]
pub struct Pkgbuild {
    vars: HashMap<String, String>,
}

impl Pkgbuild {
    /// Parse a PKGBUILD file; a missing file yields an empty result,
    /// which the reconciler reads as "new package".
    pub fn parse_file(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Line-oriented `key = value` scan
    pub fn parse(content: &str) -> Self {
        // Intentionally shallow: no bash evaluation, no arrays
        let line_re = match Regex::new(r"^([A-Za-z0-9_]+)\s*=\s*(.*)$") {
            Ok(re) => re,
            Err(_) => return Self::default(),
        };

        let mut vars = HashMap::new();
        for line in content.lines() {
            if let Some(caps) = line_re.captures(line.trim()) {
                vars.insert(caps[1].to_string(), caps[2].trim().to_string());
            }
        }
        Self { vars }
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Current upstream version field
    pub fn pkgver(&self) -> Option<&str> {
        self.get("pkgver")
    }

    /// Current package revision counter
    pub fn pkgrel(&self) -> Option<u32> {
        self.get("pkgrel").and_then(|v| v.parse().ok())
    }
}

/// Regenerate `.SRCINFO` from the checked-out directory
pub fn generate_srcinfo(dir: &Path) -> AurbumpResult<()> {
    let output = Command::new("makepkg")
        .arg("--printsrcinfo")
        .current_dir(dir)
        .output()
        .map_err(|e| {
            AurbumpError::repository_io(dir.display().to_string(), "cannot run makepkg", e)
        })?;
    if !output.status.success() {
        return Err(AurbumpError::repository(
            dir.display().to_string(),
            format!(
                "makepkg --printsrcinfo failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    let srcinfo_path = dir.join(".SRCINFO");
    fs::write(&srcinfo_path, &output.stdout).map_err(|e| {
        AurbumpError::repository_io(srcinfo_path.display().to_string(), "cannot write .SRCINFO", e)
    })?;
    Ok(())
}
