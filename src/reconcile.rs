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

//! Revision reconciliation: the per-package update pipeline.
//!
//! The revision number written into the template depends on whether this
//! render differs from the last commit, which is only known after a first
//! render has been diffed. Hence the two passes: render with the existing
//! revision, diff, recompute the revision, render again. A brand-new package
//! always proceeds to a commit so the AUR entry gets created, even when the
//! first diff comes back empty.

use console::style;
use std::path::PathBuf;

use crate::config::PackageSpec;
use crate::error::{AurbumpError, AurbumpResult};
use crate::fetch;
use crate::repo::{generate_srcinfo, Pkgbuild, PkgRepo};
use crate::source::{github, matcher, Release, RenderedArtifact};
use crate::template::{self, Context};

/// Toggles and paths for a package run
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Commit the rendered changes
    pub commit: bool,
    /// Push after committing
    pub push: bool,
    /// Top-level build directory; each package gets a subdirectory
    pub build_dir: PathBuf,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            commit: true,
            push: true,
            build_dir: PathBuf::from("build"),
        }
    }
}

/// Terminal state of a package pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Working tree matched the cloned state, nothing committed
    Unchanged,
    /// A new revision was rendered (and committed/pushed if enabled)
    Updated { version: String, revision: u32 },
}

/// Run the full update pipeline for one package
pub fn process_package(pkg: &PackageSpec, opts: &UpdateOptions) -> AurbumpResult<Outcome> {
    println!("{}", style(format!(":: updating {}", pkg.name)).green().bold());

    if !pkg.template.is_dir() {
        return Err(AurbumpError::repository(
            pkg.template.display().to_string(),
            "template directory does not exist",
        ));
    }

    let token = github::token_from_env()?;
    let build_path = opts.build_dir.join(&pkg.name);

    // Resolve every source; all must agree on the version
    let mut artifacts: Vec<RenderedArtifact> = Vec::new();
    let mut agreed: Option<Release> = None;
    for spec in &pkg.sources {
        tracing::debug!(strategy = spec.strategy_name(), "resolving source");
        let source = spec.connect(&token)?;
        let release = source.latest_release()?;
        tracing::debug!(
            strategy = release.strategy,
            tag = %release.tag,
            version = %release.version,
            "resolved release"
        );
        check_agreement(&mut agreed, &release)?;

        let url = source.source_url(&release)?;
        let local = fetch::fetch(&url, &build_path)?;
        let sha512 = fetch::hash_file(&local)?;
        println!("   SHA512: {}", style(&sha512).dim());

        artifacts.push(RenderedArtifact {
            url,
            sha512,
            version: release.version,
        });
    }

    tracing::debug!(artifacts = ?artifacts, "resolved artifacts");
    let release = agreed.ok_or_else(|| {
        AurbumpError::config(format!("package '{}' has no sources", pkg.name))
    })?;
    let version = matcher::sanitize_version(&release.version);
    println!(
        "   processed {} source(s), latest release: {}",
        artifacts.len(),
        style(&version).cyan()
    );

    // CLONED
    let dest = build_path.join("repo");
    println!("{}", style(":: cloning from AUR").cyan());
    let repo = PkgRepo::clone_fresh(&crate::repo::clone_url(&pkg.name), &dest)?;

    let pkgbuild = Pkgbuild::parse_file(&dest.join("PKGBUILD"));
    let new_package = pkgbuild.is_empty();
    let current_rel = pkgbuild.pkgrel().unwrap_or(1);
    if new_package {
        println!("{}", style("   no such package in the AUR yet").yellow());
    } else {
        tracing::debug!(pkgrel = current_rel, "current revision");
    }

    // RENDERED_1: render with the existing revision to learn whether
    // anything changed at all
    render_pass(pkg, &repo, current_rel, &version, &artifacts)?;

    let decision = decide_outcome(
        repo.is_dirty()?,
        new_package,
        pkgbuild.pkgver(),
        current_rel,
        &version,
    );
    match decision {
        Decision::Rerender { revision } => {
            // RENDERED_2: revision is now known, render again with it
            println!("   updated pkgrel to {}", revision);
            render_pass(pkg, &repo, revision, &version, &artifacts)?;
            finalize(&repo, &version, opts)?;
            Ok(Outcome::Updated { version, revision })
        }
        Decision::CommitAsIs { revision } => {
            // A first commit is required to create the package
            finalize(&repo, &version, opts)?;
            Ok(Outcome::Updated { version, revision })
        }
        Decision::Unchanged => {
            println!("   no changes required for {}", pkg.name);
            Ok(Outcome::Unchanged)
        }
    }
}

/// Record a resolved release, enforcing that every source of a package
/// agrees on the version. The first release seen becomes the reference.
fn check_agreement(agreed: &mut Option<Release>, release: &Release) -> AurbumpResult<()> {
    match agreed {
        Some(first) if *first != *release => Err(AurbumpError::VersionConflict {
            first: first.version.clone(),
            second: release.version.clone(),
        }),
        Some(_) => Ok(()),
        None => {
            *agreed = Some(release.clone());
            Ok(())
        }
    }
}

/// What happens after the first render pass
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    /// Working tree matches the cloned state and the package already exists
    Unchanged,
    /// Clean tree but the package is brand new; commit the first render
    CommitAsIs { revision: u32 },
    /// The render changed something; render again at the recomputed revision
    Rerender { revision: u32 },
}

/// Post-render decision, separated from the git plumbing that feeds it
fn decide_outcome(
    dirty: bool,
    new_package: bool,
    existing_pkgver: Option<&str>,
    existing_rel: u32,
    version: &str,
) -> Decision {
    if dirty {
        Decision::Rerender {
            revision: next_revision(existing_pkgver, existing_rel, version),
        }
    } else if new_package {
        Decision::CommitAsIs {
            revision: existing_rel,
        }
    } else {
        Decision::Unchanged
    }
}

/// Next revision counter: same upstream version bumps, a new version resets
pub fn next_revision(existing_pkgver: Option<&str>, existing_rel: u32, version: &str) -> u32 {
    match existing_pkgver {
        Some(existing) if existing == version => existing_rel + 1,
        _ => 1,
    }
}

fn render_pass(
    pkg: &PackageSpec,
    repo: &PkgRepo,
    revision: u32,
    version: &str,
    artifacts: &[RenderedArtifact],
) -> AurbumpResult<()> {
    let context = render_context(&pkg.name, revision, version, artifacts);
    template::render_dir(&pkg.template, repo.dir(), &context)?;
    generate_srcinfo(repo.dir())
}

/// Template context: package metadata, revision, version and the quoted
/// per-source URL/checksum lists PKGBUILD arrays expect
pub fn render_context(
    package: &str,
    revision: u32,
    version: &str,
    artifacts: &[RenderedArtifact],
) -> Context {
    let mut context = Context::new();
    context.set("package", package);
    context.set("version", version);
    context.set("rel", revision.to_string());
    context.set("sources", quote_join(artifacts.iter().map(|a| a.url.as_str())));
    context.set(
        "checksums",
        quote_join(artifacts.iter().map(|a| a.sha512.as_str())),
    );
    context
}

fn quote_join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items
        .map(|item| format!("'{}'", item))
        .collect::<Vec<_>>()
        .join(" ")
}

fn finalize(repo: &PkgRepo, version: &str, opts: &UpdateOptions) -> AurbumpResult<()> {
    if opts.push && !opts.commit {
        tracing::warn!("push requested without commit; there will be nothing new to push");
    }
    if opts.commit {
        println!("{}", style(":: committing to AUR").cyan());
        repo.commit_all(&format!("Updated to {}", version))?;
    }
    if opts.push {
        repo.push()?;
    }
    Ok(())
}
