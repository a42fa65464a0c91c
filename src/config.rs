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

//! Configuration schema with strict validation.
//!
//! Unknown fields are rejected everywhere. Each source strategy carries its
//! own strongly-typed configuration and is validated eagerly at load time,
//! so a bad pattern fails the run before any package is processed.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AurbumpError, AurbumpResult};
use crate::source::matcher;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Packages to keep up to date
    pub packages: Vec<PackageSpec>,
}

/// A package to keep up to date
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSpec {
    /// AUR package name, also the clone target
    pub name: String,

    /// Directory holding the packaging template
    pub template: PathBuf,

    /// Upstream sources; all must resolve to the same version
    pub sources: Vec<SourceSpec>,
}

/// A source strategy with its strategy-specific configuration.
///
/// Closed sum type: adding a strategy means adding a variant here and an
/// implementation in `source/`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "strategy", content = "config", rename_all = "snake_case")]
pub enum SourceSpec {
    /// Download a named asset attached to a GitHub release
    GithubReleaseAsset(GithubAssetConfig),
    /// Download the auto-generated source tarball of a GitHub release
    GithubReleaseTarball(GithubTarballConfig),
}

fn default_version_regex() -> String {
    "(.*)".to_string()
}

/// Configuration for the GitHub release-asset strategy
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GithubAssetConfig {
    /// Repository in `owner/repo` form
    pub github_repo: String,

    /// Consider prerelease entries as well
    #[serde(default)]
    pub allow_prereleases: bool,

    /// Pattern selecting the downloadable asset by name
    pub source_regex: String,

    /// Pattern extracting the version from the release tag
    #[serde(default = "default_version_regex")]
    pub version_regex: String,

    /// Concatenation order when the version pattern has multiple groups
    #[serde(default)]
    pub version_group_order: Vec<usize>,
}

/// Configuration for the GitHub release-tarball strategy
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GithubTarballConfig {
    /// Repository in `owner/repo` form
    pub github_repo: String,

    /// Consider prerelease entries as well
    #[serde(default)]
    pub allow_prereleases: bool,

    /// Pattern extracting the version from the release tag
    #[serde(default = "default_version_regex")]
    pub version_regex: String,

    /// Concatenation order when the version pattern has multiple groups
    #[serde(default)]
    pub version_group_order: Vec<usize>,
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> AurbumpResult<Config> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AurbumpError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
    }

    /// Parse and validate configuration from a YAML string
    pub fn parse(raw: &str) -> AurbumpResult<Config> {
        let config: Config =
            serde_yaml_ng::from_str(raw).map_err(|e| AurbumpError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration beyond what serde enforces
    pub fn validate(&self) -> AurbumpResult<()> {
        let mut seen = HashSet::new();
        for pkg in &self.packages {
            if pkg.name.is_empty() {
                return Err(AurbumpError::config("package name must not be empty"));
            }
            if !seen.insert(pkg.name.as_str()) {
                return Err(AurbumpError::config(format!(
                    "duplicate package name '{}'",
                    pkg.name
                )));
            }
            if pkg.sources.is_empty() {
                return Err(AurbumpError::config(format!(
                    "package '{}' has no sources",
                    pkg.name
                )));
            }
            for source in &pkg.sources {
                source.validate(&pkg.name)?;
            }
        }
        Ok(())
    }

    /// Look up a package by name
    pub fn package(&self, name: &str) -> Option<&PackageSpec> {
        self.packages.iter().find(|p| p.name == name)
    }
}

impl SourceSpec {
    /// Strategy identifier as written in the configuration file
    pub fn strategy_name(&self) -> &'static str {
        match self {
            SourceSpec::GithubReleaseAsset(_) => "github_release_asset",
            SourceSpec::GithubReleaseTarball(_) => "github_release_tarball",
        }
    }

    fn validate(&self, package: &str) -> AurbumpResult<()> {
        match self {
            SourceSpec::GithubReleaseAsset(cfg) => {
                validate_github_repo(package, &cfg.github_repo)?;
                validate_pattern(package, "source_regex", &cfg.source_regex)?;
                validate_pattern(package, "version_regex", &cfg.version_regex)?;
            }
            SourceSpec::GithubReleaseTarball(cfg) => {
                validate_github_repo(package, &cfg.github_repo)?;
                validate_pattern(package, "version_regex", &cfg.version_regex)?;
            }
        }
        Ok(())
    }
}

fn validate_github_repo(package: &str, repo: &str) -> AurbumpResult<()> {
    // owner/repo, same character class the AUR tolerates in project names
    let re = Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$")
        .map_err(|e| AurbumpError::config(e.to_string()))?;
    if !re.is_match(repo) {
        return Err(AurbumpError::config(format!(
            "package '{}': github_repo '{}' is not in owner/repo form",
            package, repo
        )));
    }
    Ok(())
}

fn validate_pattern(package: &str, field: &str, pattern: &str) -> AurbumpResult<()> {
    matcher::compile_anchored(pattern).map_err(|_| {
        AurbumpError::config(format!(
            "package '{}': {} '{}' is not a valid pattern",
            package, field, pattern
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"
packages:
  - name: some-tool-bin
    template: templates/some-tool-bin
    sources:
      - strategy: github_release_asset
        config:
          github_repo: owner/some-tool
          source_regex: some-tool-.*-linux-x86_64\.tar\.gz
          version_regex: v(.*)
"#;

    #[test]
    fn test_parse_valid_config() {
        let config = Config::parse(GOOD).unwrap();
        assert_eq!(config.packages.len(), 1);
        let pkg = &config.packages[0];
        assert_eq!(pkg.name, "some-tool-bin");
        assert_eq!(pkg.sources.len(), 1);
        match &pkg.sources[0] {
            SourceSpec::GithubReleaseAsset(cfg) => {
                assert_eq!(cfg.github_repo, "owner/some-tool");
                assert!(!cfg.allow_prereleases);
                assert_eq!(cfg.version_regex, "v(.*)");
                assert!(cfg.version_group_order.is_empty());
            }
            other => panic!("wrong strategy: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_top_level_field_rejected() {
        let raw = format!("{}\nextra_field: 1\n", GOOD);
        assert!(Config::parse(&raw).is_err());
    }

    #[test]
    fn test_unknown_source_field_rejected() {
        let raw = r#"
packages:
  - name: pkg
    template: t
    sources:
      - strategy: github_release_tarball
        config:
          github_repo: owner/repo
          surprising: true
"#;
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let raw = r#"
packages:
  - name: pkg
    template: t
    sources:
      - strategy: gitlab_release
        config:
          github_repo: owner/repo
"#;
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn test_bad_repo_pattern_rejected() {
        let raw = r#"
packages:
  - name: pkg
    template: t
    sources:
      - strategy: github_release_tarball
        config:
          github_repo: not-a-repo
"#;
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn test_bad_regex_rejected() {
        let raw = r#"
packages:
  - name: pkg
    template: t
    sources:
      - strategy: github_release_tarball
        config:
          github_repo: owner/repo
          version_regex: "("
"#;
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn test_empty_sources_rejected() {
        let raw = r#"
packages:
  - name: pkg
    template: t
    sources: []
"#;
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn test_duplicate_package_rejected() {
        let raw = r#"
packages:
  - name: pkg
    template: t
    sources:
      - strategy: github_release_tarball
        config:
          github_repo: owner/repo
  - name: pkg
    template: t2
    sources:
      - strategy: github_release_tarball
        config:
          github_repo: owner/other
"#;
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn test_package_lookup() {
        let config = Config::parse(GOOD).unwrap();
        assert!(config.package("some-tool-bin").is_some());
        assert!(config.package("missing").is_none());
    }
}
