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

//! GitHub release strategies.
//!
//! Both strategies fetch the release listing once at construction and keep
//! the selected entry for the rest of the package pass. Provider failures
//! surface as fatal for the current package; there is no retry loop.

use serde::Deserialize;
use std::time::Duration;

use crate::config::{GithubAssetConfig, GithubTarballConfig};
use crate::error::{AurbumpError, AurbumpResult};
use crate::source::{matcher, Asset, PackageSource, Release};

/// Environment variable holding the GitHub API token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

const API_BASE: &str = "https://api.github.com";
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Read the GitHub token from the environment.
///
/// Absence is fatal for any package relying on a GitHub strategy.
pub fn token_from_env() -> AurbumpResult<String> {
    require_token(std::env::var(TOKEN_ENV).ok())
}

fn require_token(value: Option<String>) -> AurbumpResult<String> {
    value.ok_or_else(|| {
        AurbumpError::config(format!("{} is not set in the environment", TOKEN_ENV))
    })
}

/// One entry of the release listing
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GhRelease {
    pub tag_name: String,
    #[serde(default)]
    pub prerelease: bool,
    pub tarball_url: String,
    #[serde(default)]
    pub assets: Vec<GhAsset>,
}

/// A file attached to a release
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GhAsset {
    pub name: String,
    pub size: u64,
    pub browser_download_url: String,
}

impl GhAsset {
    fn to_asset(&self) -> Asset {
        Asset {
            name: self.name.clone(),
            size: self.size,
            download_url: self.browser_download_url.clone(),
        }
    }
}

fn fetch_releases(repo: &str, token: &str) -> AurbumpResult<Vec<GhRelease>> {
    let url = format!("{}/repos/{}/releases?per_page=100", API_BASE, repo);
    let response = ureq::get(&url)
        .set("User-Agent", crate::USER_AGENT)
        .set("Authorization", &format!("Bearer {}", token))
        .set("Accept", "application/vnd.github+json")
        .timeout(API_TIMEOUT)
        .call()
        .map_err(|e| AurbumpError::network(&url, e))?;
    response
        .into_json()
        .map_err(|e| AurbumpError::network_msg(&url, format!("invalid release listing: {}", e)))
}

/// First qualifying entry of a reverse-chronological release listing
fn select_release(
    releases: Vec<GhRelease>,
    allow_prereleases: bool,
    repo: &str,
) -> AurbumpResult<GhRelease> {
    releases
        .into_iter()
        .find(|r| allow_prereleases || !r.prerelease)
        .ok_or_else(|| AurbumpError::NoSuitableRelease {
            repo: repo.to_string(),
        })
}

/// Strategy downloading a named asset attached to a GitHub release
pub struct GithubAssetSource {
    config: GithubAssetConfig,
    selected: GhRelease,
}

impl GithubAssetSource {
    /// Fetch the release listing and pin the latest qualifying entry
    pub fn connect(config: GithubAssetConfig, token: &str) -> AurbumpResult<Self> {
        let releases = fetch_releases(&config.github_repo, token)?;
        let selected = select_release(releases, config.allow_prereleases, &config.github_repo)?;
        tracing::debug!(repo = %config.github_repo, tag = %selected.tag_name, "selected release");
        Ok(Self { config, selected })
    }
}

impl PackageSource for GithubAssetSource {
    fn latest_release(&self) -> AurbumpResult<Release> {
        let version = matcher::resolve_version(
            &self.selected.tag_name,
            &self.config.version_regex,
            &self.config.version_group_order,
        )?;
        Ok(Release {
            strategy: "github_release_asset",
            tag: self.selected.tag_name.clone(),
            version,
        })
    }

    fn source_url(&self, _release: &Release) -> AurbumpResult<String> {
        let assets: Vec<Asset> = self.selected.assets.iter().map(GhAsset::to_asset).collect();
        let asset = matcher::resolve_asset(&assets, &self.config.source_regex)?;
        Ok(asset.download_url.clone())
    }
}

/// Strategy downloading the auto-generated source tarball of a release
pub struct GithubTarballSource {
    config: GithubTarballConfig,
    selected: GhRelease,
}

impl GithubTarballSource {
    /// Fetch the release listing and pin the latest qualifying entry
    pub fn connect(config: GithubTarballConfig, token: &str) -> AurbumpResult<Self> {
        let releases = fetch_releases(&config.github_repo, token)?;
        let selected = select_release(releases, config.allow_prereleases, &config.github_repo)?;
        tracing::debug!(repo = %config.github_repo, tag = %selected.tag_name, "selected release");
        Ok(Self { config, selected })
    }
}

impl PackageSource for GithubTarballSource {
    fn latest_release(&self) -> AurbumpResult<Release> {
        let version = matcher::resolve_version(
            &self.selected.tag_name,
            &self.config.version_regex,
            &self.config.version_group_order,
        )?;
        Ok(Release {
            strategy: "github_release_tarball",
            tag: self.selected.tag_name.clone(),
            version,
        })
    }

    fn source_url(&self, _release: &Release) -> AurbumpResult<String> {
        Ok(self.selected.tarball_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(tag: &str, prerelease: bool) -> GhRelease {
        GhRelease {
            tag_name: tag.to_string(),
            prerelease,
            tarball_url: format!("https://api.github.com/repos/o/r/tarball/{}", tag),
            assets: vec![],
        }
    }

    #[test]
    fn test_select_skips_prereleases() {
        let releases = vec![release("v2.0.0-rc1", true), release("v1.9.0", false)];
        let selected = select_release(releases, false, "o/r").unwrap();
        assert_eq!(selected.tag_name, "v1.9.0");
    }

    #[test]
    fn test_select_allows_prereleases_when_configured() {
        let releases = vec![release("v2.0.0-rc1", true), release("v1.9.0", false)];
        let selected = select_release(releases, true, "o/r").unwrap();
        assert_eq!(selected.tag_name, "v2.0.0-rc1");
    }

    #[test]
    fn test_select_no_suitable_release() {
        let releases = vec![release("v2.0.0-rc1", true)];
        let err = select_release(releases, false, "o/r").unwrap_err();
        assert!(matches!(err, AurbumpError::NoSuitableRelease { .. }));

        let err = select_release(vec![], true, "o/r").unwrap_err();
        assert!(matches!(err, AurbumpError::NoSuitableRelease { .. }));
    }

    #[test]
    fn test_release_listing_deserialization() {
        // Trimmed-down shape of the /repos/{repo}/releases payload
        let payload = r#"[
            {
                "tag_name": "v1.2.3",
                "prerelease": false,
                "tarball_url": "https://api.github.com/repos/o/r/tarball/v1.2.3",
                "assets": [
                    {
                        "name": "tool-1.2.3-linux.tar.gz",
                        "size": 123456,
                        "browser_download_url": "https://github.com/o/r/releases/download/v1.2.3/tool-1.2.3-linux.tar.gz"
                    }
                ]
            }
        ]"#;
        let releases: Vec<GhRelease> = serde_json::from_str(payload).unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].tag_name, "v1.2.3");
        assert_eq!(releases[0].assets[0].size, 123456);
    }

    #[test]
    fn test_missing_token() {
        let err = require_token(None).unwrap_err();
        assert!(matches!(err, AurbumpError::Config { .. }));

        assert_eq!(require_token(Some("t0ken".to_string())).unwrap(), "t0ken");
    }
}
