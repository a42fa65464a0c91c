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

//! Template directory rendering.
//!
//! Files ending in `.tpl` pass through `{{ key }}` placeholder substitution
//! and lose the suffix; every other file is copied byte-for-byte. Version
//! control metadata and the generated build-info file are never copied.

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{AurbumpError, AurbumpResult};

/// Suffix marking a file for rendering
pub const TEMPLATE_SUFFIX: &str = ".tpl";

/// Entries never copied or rendered
const IGNORED: [&str; 3] = [".git", ".gitignore", ".SRCINFO"];

/// Render context: flat string bindings for placeholder substitution
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Substitute `{{ key }}` placeholders in `input`.
///
/// A placeholder with no binding is an error: a typoed key would otherwise
/// silently publish a broken PKGBUILD.
pub fn render(input: &str, context: &Context) -> AurbumpResult<String> {
    let placeholder = Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
        .map_err(|e| AurbumpError::config(e.to_string()))?;

    let mut output = String::with_capacity(input.len());
    let mut last = 0;
    for caps in placeholder.captures_iter(input) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let key = &caps[1];
        let value = context
            .get(key)
            .ok_or_else(|| AurbumpError::Template {
                name: key.to_string(),
            })?;
        output.push_str(&input[last..whole.start()]);
        output.push_str(value);
        last = whole.end();
    }
    output.push_str(&input[last..]);
    Ok(output)
}

/// Render a template directory into `dest`.
///
/// The destination is created if needed and existing files are overwritten,
/// which is what lets the reconciler re-render into a fresh clone.
pub fn render_dir(src: &Path, dest: &Path, context: &Context) -> AurbumpResult<()> {
    if !src.is_dir() {
        return Err(AurbumpError::repository(
            src.display().to_string(),
            "template directory does not exist",
        ));
    }
    fs::create_dir_all(dest).map_err(|e| {
        AurbumpError::repository_io(dest.display().to_string(), "cannot create directory", e)
    })?;
    copy_entries(src, dest, context)
}

fn copy_entries(src: &Path, dest: &Path, context: &Context) -> AurbumpResult<()> {
    let entries = fs::read_dir(src).map_err(|e| {
        AurbumpError::repository_io(src.display().to_string(), "cannot read directory", e)
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            AurbumpError::repository_io(src.display().to_string(), "cannot read directory", e)
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if IGNORED.contains(&name.as_str()) {
            continue;
        }

        let path = entry.path();
        if path.is_dir() {
            let sub_dest = dest.join(&name);
            fs::create_dir_all(&sub_dest).map_err(|e| {
                AurbumpError::repository_io(
                    sub_dest.display().to_string(),
                    "cannot create directory",
                    e,
                )
            })?;
            copy_entries(&path, &sub_dest, context)?;
        } else if let Some(stem) = name.strip_suffix(TEMPLATE_SUFFIX) {
            let input = fs::read_to_string(&path).map_err(|e| {
                AurbumpError::repository_io(path.display().to_string(), "cannot read template", e)
            })?;
            let output = render(&input, context)?;
            let target = dest.join(stem);
            fs::write(&target, output).map_err(|e| {
                AurbumpError::repository_io(target.display().to_string(), "cannot write file", e)
            })?;
        } else {
            let target = dest.join(&name);
            fs::copy(&path, &target).map_err(|e| {
                AurbumpError::repository_io(target.display().to_string(), "cannot copy file", e)
            })?;
        }
    }
    Ok(())
}
