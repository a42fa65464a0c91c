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

//! Upstream source resolution.
//!
//! A source strategy knows how to find the latest qualifying release of an
//! upstream project and the concrete download URL for it. Strategies are a
//! closed set dispatched from [`SourceSpec::connect`].

pub mod github;
pub mod matcher;

pub use github::{GithubAssetSource, GithubTarballSource};

use crate::config::SourceSpec;
use crate::error::AurbumpResult;

/// A tagged, versioned publication point at an upstream source.
///
/// Two releases are equal iff their normalized version strings match; the
/// originating strategy and tag carry no weight in the comparison. This is
/// what lets multiple sources of one package assert version agreement.
#[derive(Debug, Clone)]
pub struct Release {
    /// Strategy that produced this release
    pub strategy: &'static str,
    /// Raw upstream tag
    pub tag: String,
    /// Normalized version extracted from the tag
    pub version: String,
}

impl PartialEq for Release {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for Release {}

/// A downloadable file attached to a release. Transient during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub size: u64,
    pub download_url: String,
}

/// Fully resolved per-source output consumed by templating
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub url: String,
    pub sha512: String,
    pub version: String,
}

/// A pluggable method of locating a release and its download URL
pub trait PackageSource {
    /// The latest qualifying release of the upstream project
    fn latest_release(&self) -> AurbumpResult<Release>;

    /// Concrete download URL for a release
    fn source_url(&self, release: &Release) -> AurbumpResult<String>;
}

impl SourceSpec {
    /// Instantiate the strategy this spec names.
    ///
    /// Fetches the upstream release listing, so this performs network I/O.
    pub fn connect(&self, token: &str) -> AurbumpResult<Box<dyn PackageSource>> {
        match self {
            SourceSpec::GithubReleaseAsset(cfg) => {
                Ok(Box::new(GithubAssetSource::connect(cfg.clone(), token)?))
            }
            SourceSpec::GithubReleaseTarball(cfg) => {
                Ok(Box::new(GithubTarballSource::connect(cfg.clone(), token)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_equality_ignores_tag_and_strategy() {
        let a = Release {
            strategy: "github_release_asset",
            tag: "v1.2.3".to_string(),
            version: "1.2.3".to_string(),
        };
        let b = Release {
            strategy: "github_release_tarball",
            tag: "release-1.2.3".to_string(),
            version: "1.2.3".to_string(),
        };
        assert_eq!(a, b);

        let c = Release {
            version: "1.2.4".to_string(),
            ..b.clone()
        };
        assert_ne!(a, c);
    }
}
