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

//! Version and asset matching.
//!
//! Release tags are turned into version strings and release assets are
//! narrowed down to a single candidate, both with full-match regex
//! semantics. The multi-candidate tie-break is a fixed compatibility
//! contract: identical sizes pick the first seen, differing sizes pick the
//! lexicographically smallest name.

use regex::Regex;
use std::collections::HashSet;

use crate::error::{AurbumpError, AurbumpResult};
use crate::source::Asset;

/// Compile a pattern anchored at both ends, giving full-match semantics
pub fn compile_anchored(pattern: &str) -> AurbumpResult<Regex> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| AurbumpError::config(format!("invalid pattern '{}': {}", pattern, e)))
}

/// Extract the normalized version string from a release tag.
///
/// The tag must fully match `pattern`. One capture group selects the version
/// directly; with several groups, `group_order` must list each group index
/// exactly once (0-based) and the version is the concatenation of the groups
/// in that order.
pub fn resolve_version(tag: &str, pattern: &str, group_order: &[usize]) -> AurbumpResult<String> {
    let regex = compile_anchored(pattern)?;
    let groups = regex.captures_len() - 1;

    let mismatch = || AurbumpError::VersionMismatch {
        tag: tag.to_string(),
        pattern: pattern.to_string(),
    };

    let caps = regex.captures(tag).ok_or_else(mismatch)?;
    if groups == 0 {
        return Err(mismatch());
    }
    if groups == 1 {
        return caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .ok_or_else(mismatch);
    }

    let distinct: HashSet<&usize> = group_order.iter().collect();
    if group_order.len() != groups
        || distinct.len() != group_order.len()
        || group_order.iter().any(|&i| i >= groups)
    {
        return Err(AurbumpError::BadGroupOrder {
            groups,
            order_len: group_order.len(),
        });
    }

    let mut version = String::new();
    for &index in group_order {
        // A group that did not participate in the match cannot contribute
        let m = caps.get(index + 1).ok_or_else(mismatch)?;
        version.push_str(m.as_str());
    }
    Ok(version)
}

/// Pick the single asset whose name fully matches `pattern`.
///
/// Zero matches is an error. Multiple matches with identical byte sizes are
/// treated as interchangeable and the first seen wins; differing sizes break
/// the tie by ascending name order.
pub fn resolve_asset<'a>(assets: &'a [Asset], pattern: &str) -> AurbumpResult<&'a Asset> {
    let regex = compile_anchored(pattern)?;
    let candidates: Vec<&Asset> = assets.iter().filter(|a| regex.is_match(&a.name)).collect();

    match candidates.as_slice() {
        [] => Err(AurbumpError::NoMatchingAsset {
            pattern: pattern.to_string(),
        }),
        [single] => Ok(*single),
        many => {
            let mut best = many[0];
            if many.iter().any(|a| a.size != best.size) {
                for &asset in &many[1..] {
                    if asset.name < best.name {
                        best = asset;
                    }
                }
            }
            Ok(best)
        }
    }
}

/// Replace characters pkgver cannot carry
pub fn sanitize_version(version: &str) -> String {
    version.replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn asset(name: &str, size: u64) -> Asset {
        Asset {
            name: name.to_string(),
            size,
            download_url: format!("https://example.invalid/{}", name),
        }
    }

    #[test]
    fn test_single_group_version() {
        let version = resolve_version("v1.2.3", r"v(.*)", &[]).unwrap();
        assert_eq!(version, "1.2.3");
    }

    #[test]
    fn test_default_pattern_captures_whole_tag() {
        let version = resolve_version("2024.01.15", "(.*)", &[]).unwrap();
        assert_eq!(version, "2024.01.15");
    }

    #[test]
    fn test_partial_match_rejected() {
        // Anchoring: the pattern must cover the whole tag
        let err = resolve_version("v1.2.3-rc1", r"v(\d+\.\d+\.\d+)", &[]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Resolution);
    }

    #[test]
    fn test_zero_groups_rejected() {
        let err = resolve_version("v1.2.3", r"v.*", &[]).unwrap_err();
        assert!(matches!(err, AurbumpError::VersionMismatch { .. }));
    }

    #[test]
    fn test_group_order_concatenation() {
        let version = resolve_version("v1.2.3", r"v(1)\.(2)\.(3)", &[2, 1, 0]).unwrap();
        assert_eq!(version, "321");

        let version = resolve_version("v1.2.3", r"v(1)\.(2)\.(3)", &[0, 1, 2]).unwrap();
        assert_eq!(version, "123");
    }

    #[test]
    fn test_group_order_determinism() {
        let first = resolve_version("v9.8.7", r"v(\d+)\.(\d+)\.(\d+)", &[2, 0, 1]).unwrap();
        let second = resolve_version("v9.8.7", r"v(\d+)\.(\d+)\.(\d+)", &[2, 0, 1]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "798");
    }

    #[test]
    fn test_group_order_wrong_length() {
        let err = resolve_version("v1.2", r"v(\d+)\.(\d+)", &[0]).unwrap_err();
        assert!(matches!(err, AurbumpError::BadGroupOrder { groups: 2, order_len: 1 }));
    }

    #[test]
    fn test_group_order_duplicate_index() {
        let err = resolve_version("v1.2", r"v(\d+)\.(\d+)", &[0, 0]).unwrap_err();
        assert!(matches!(err, AurbumpError::BadGroupOrder { .. }));
    }

    #[test]
    fn test_group_order_out_of_range() {
        let err = resolve_version("v1.2", r"v(\d+)\.(\d+)", &[0, 2]).unwrap_err();
        assert!(matches!(err, AurbumpError::BadGroupOrder { .. }));
    }

    #[test]
    fn test_single_group_ignores_group_order() {
        // With exactly one capture group the order list is "single group" mode
        let version = resolve_version("v1.2.3", r"v(.*)", &[0]).unwrap();
        assert_eq!(version, "1.2.3");
    }

    #[test]
    fn test_asset_no_match() {
        let assets = vec![asset("tool.deb", 100)];
        let err = resolve_asset(&assets, r".*\.zip").unwrap_err();
        assert!(matches!(err, AurbumpError::NoMatchingAsset { .. }));
    }

    #[test]
    fn test_asset_single_match() {
        let assets = vec![asset("tool.zip", 100), asset("tool.deb", 200)];
        let found = resolve_asset(&assets, r".*\.zip").unwrap();
        assert_eq!(found.name, "tool.zip");
    }

    #[test]
    fn test_asset_full_match_only() {
        let assets = vec![asset("tool.zip.sig", 100)];
        assert!(resolve_asset(&assets, r".*\.zip").is_err());
    }

    #[test]
    fn test_asset_identical_sizes_first_seen() {
        let assets = vec![asset("b.zip", 100), asset("a.zip", 100)];
        let found = resolve_asset(&assets, r".*\.zip").unwrap();
        // Interchangeable candidates: the first seen wins, not the smallest name
        assert_eq!(found.name, "b.zip");

        let again = resolve_asset(&assets, r".*\.zip").unwrap();
        assert_eq!(found, again);
    }

    #[test]
    fn test_asset_differing_sizes_lexicographic() {
        let assets = vec![asset("b.zip", 200), asset("a.zip", 100)];
        let found = resolve_asset(&assets, r".*\.zip").unwrap();
        assert_eq!(found.name, "a.zip");

        let assets = vec![asset("a.zip", 100), asset("b.zip", 200)];
        let found = resolve_asset(&assets, r".*\.zip").unwrap();
        assert_eq!(found.name, "a.zip");
    }

    #[test]
    fn test_sanitize_version() {
        assert_eq!(sanitize_version("1.2.3-rc1"), "1.2.3_rc1");
        assert_eq!(sanitize_version("1.2.3"), "1.2.3");
    }
}
