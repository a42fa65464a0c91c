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

//! Error types for the update pipeline.

use thiserror::Error;

/// Main error type for aurbump operations
#[derive(Debug, Error)]
pub enum AurbumpError {
    /// Configuration errors (schema violations, bad patterns, missing credentials)
    #[error("configuration error: {message}")]
    Config { message: String },

    /// No release qualified after prerelease filtering
    #[error("no suitable release found for '{repo}'")]
    NoSuitableRelease { repo: String },

    /// The release tag did not fully match the version pattern
    #[error("version '{tag}' does not match pattern '{pattern}'")]
    VersionMismatch { tag: String, pattern: String },

    /// version_group_order does not select every capture group exactly once
    #[error("bad version group order: pattern has {groups} groups, order lists {order_len} indices")]
    BadGroupOrder { groups: usize, order_len: usize },

    /// No release asset matched the source pattern
    #[error("no valid assets found for pattern '{pattern}'")]
    NoMatchingAsset { pattern: String },

    /// Network errors during API calls or downloads
    #[error("network error for {url}: {message}")]
    Network {
        url: String,
        message: String,
        #[source]
        source: Option<Box<ureq::Error>>,
    },

    /// Sources within one package disagree on the resolved version
    #[error("mismatched version between sources: '{first}' vs '{second}'")]
    VersionConflict { first: String, second: String },

    /// Repository and filesystem errors (clone failure, missing template, tool failure)
    #[error("repository error for '{path}': {message}")]
    Repository {
        path: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A template placeholder has no binding in the render context
    #[error("template references unknown variable '{name}'")]
    Template { name: String },
}

/// Coarse error taxonomy used for reporting and failure-policy decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Schema violations, bad patterns, or missing credentials. Schema and
    /// pattern problems surface at load time; a missing credential surfaces
    /// when a package first needs it and fails only that package.
    Config,
    /// No suitable release, no matching asset, or malformed version selection
    Resolution,
    /// Non-success transfer status
    Network,
    /// Sources within one package resolved different versions
    Consistency,
    /// Clone, template, or external tool failure
    Repository,
}

impl AurbumpError {
    /// Classify this error into the coarse taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            AurbumpError::Config { .. } => ErrorCategory::Config,
            AurbumpError::NoSuitableRelease { .. }
            | AurbumpError::VersionMismatch { .. }
            | AurbumpError::BadGroupOrder { .. }
            | AurbumpError::NoMatchingAsset { .. } => ErrorCategory::Resolution,
            AurbumpError::Network { .. } => ErrorCategory::Network,
            AurbumpError::VersionConflict { .. } => ErrorCategory::Consistency,
            AurbumpError::Repository { .. } | AurbumpError::Template { .. } => {
                ErrorCategory::Repository
            }
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        AurbumpError::Config {
            message: message.into(),
        }
    }

    /// Create a network error wrapping a transport failure
    pub fn network(url: impl Into<String>, source: ureq::Error) -> Self {
        let message = match &source {
            ureq::Error::Status(code, _) => format!("server returned status {}", code),
            other => other.to_string(),
        };
        AurbumpError::Network {
            url: url.into(),
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create a network error from a plain message
    pub fn network_msg(url: impl Into<String>, message: impl Into<String>) -> Self {
        AurbumpError::Network {
            url: url.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a repository error
    pub fn repository(path: impl Into<String>, message: impl Into<String>) -> Self {
        AurbumpError::Repository {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a repository error with an I/O source
    pub fn repository_io(
        path: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        AurbumpError::Repository {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }
}

/// Result type alias for aurbump operations
pub type AurbumpResult<T> = std::result::Result<T, AurbumpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AurbumpError::NoSuitableRelease {
            repo: "owner/repo".to_string(),
        };
        assert_eq!(format!("{}", err), "no suitable release found for 'owner/repo'");

        let err = AurbumpError::VersionConflict {
            first: "1.0.0".to_string(),
            second: "1.0.1".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "mismatched version between sources: '1.0.0' vs '1.0.1'"
        );
    }

    #[test]
    fn test_category() {
        assert_eq!(
            AurbumpError::config("bad").category(),
            ErrorCategory::Config
        );
        assert_eq!(
            AurbumpError::NoMatchingAsset {
                pattern: ".*".to_string()
            }
            .category(),
            ErrorCategory::Resolution
        );
        assert_eq!(
            AurbumpError::network_msg("http://test", "timeout").category(),
            ErrorCategory::Network
        );
        assert_eq!(
            AurbumpError::repository("build", "clone failed").category(),
            ErrorCategory::Repository
        );
        assert_eq!(
            AurbumpError::Template {
                name: "pkg".to_string()
            }
            .category(),
            ErrorCategory::Repository
        );
    }
}
