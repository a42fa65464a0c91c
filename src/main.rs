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

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::fs;
use std::path::{Path, PathBuf};

mod config;
mod error;
mod fetch;
mod logging;
mod reconcile;
mod repo;
mod source;
mod template;

use config::{Config, PackageSpec};
use error::AurbumpError;
use reconcile::{process_package, Outcome, UpdateOptions};

const VERSION: &str = "0.3.1";
const LONG_VERSION: &str = concat!(
    "0.3.1\n",
    "Copyright (C) 2025  aurbump contributors\n",
    "License GPLv3+: GNU GPL version 3 or later <https://gnu.org/licenses/gpl.html>\n\n",
    "This is free software; you are free to change and redistribute it.\n",
    "There is NO WARRANTY, to the extent permitted by law."
);

/// User-Agent header sent on every outgoing request
pub(crate) const USER_AGENT: &str = "aurbump/0.3.1";

#[derive(Parser)]
#[command(name = "aurbump")]
#[command(version = VERSION)]
#[command(long_version = LONG_VERSION)]
#[command(about = "Automated AUR package updater driven by upstream GitHub releases.")]
struct Cli {
    /// Location of the configuration file
    #[arg(long, global = true, default_value = "aurbump.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the configuration and exit
    Check,
    /// Remove rendered repositories, keeping downloaded assets
    Clean {
        /// Remove downloaded assets as well
        #[arg(long)]
        no_cache: bool,
    },
    /// Update packages
    Go {
        /// Update only this package
        #[arg(long)]
        package: Option<String>,

        /// Update all packages except this one
        #[arg(long)]
        ignore_package: Option<String>,

        /// Commit rendered changes (default)
        #[arg(long, overrides_with = "no_commit")]
        commit: bool,
        /// Do not commit
        #[arg(long)]
        no_commit: bool,

        /// Push after committing (default)
        #[arg(long, overrides_with = "no_push")]
        push: bool,
        /// Do not push
        #[arg(long)]
        no_push: bool,
    },
    /// Print version information
    Version,
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("{} {:#}", style("error:").red().bold(), err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Check => {
            Config::load(&cli.config)?;
            println!("{}", style("configuration OK").green());
            Ok(())
        }
        Command::Clean { no_cache } => {
            let conf = Config::load(&cli.config)?;
            clean(&conf, Path::new("build"), !no_cache)?;
            Ok(())
        }
        Command::Version => {
            println!("aurbump {}", LONG_VERSION);
            Ok(())
        }
        Command::Go {
            package,
            ignore_package,
            commit,
            no_commit,
            push,
            no_push,
        } => {
            let conf = Config::load(&cli.config)?;
            let opts = UpdateOptions {
                commit: commit || !no_commit,
                push: push || !no_push,
                build_dir: PathBuf::from("build"),
            };
            repo::ensure_tools()?;

            let selected =
                select_packages(&conf.packages, package.as_deref(), ignore_package.as_deref())?;
            let summary = run_packages(&selected, &opts);

            for (name, err) in &summary.failed {
                eprintln!(
                    "{} {}: {} {}",
                    style("failed:").red().bold(),
                    style(name).bold(),
                    err,
                    style(format!("[{:?}]", err.category())).dim()
                );
            }
            if !summary.failed.is_empty() {
                return Err(anyhow!(
                    "{} of {} package(s) failed",
                    summary.failed.len(),
                    summary.processed
                ));
            }
            Ok(())
        }
    }
}

/// Narrow the configured packages by the --package / --ignore-package flags
fn select_packages<'a>(
    packages: &'a [PackageSpec],
    only: Option<&str>,
    ignore: Option<&str>,
) -> Result<Vec<&'a PackageSpec>> {
    if let Some(name) = only {
        let pkg = packages
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| anyhow!("package '{}' is not in the configuration", name))?;
        return Ok(vec![pkg]);
    }

    let selected: Vec<&PackageSpec> = packages
        .iter()
        .filter(|p| Some(p.name.as_str()) != ignore)
        .collect();
    if let Some(name) = ignore {
        if selected.len() == packages.len() {
            tracing::warn!(package = name, "--ignore-package matched nothing");
        } else {
            println!("{}", style(format!(":: ignoring {}", name)).magenta());
        }
    }
    Ok(selected)
}

/// Aggregated result of a multi-package run
#[derive(Debug, Default)]
struct RunSummary {
    processed: usize,
    failed: Vec<(String, AurbumpError)>,
}

impl RunSummary {
    fn record(&mut self, name: &str, result: Result<Outcome, AurbumpError>) {
        self.processed += 1;
        match result {
            Ok(Outcome::Updated { version, revision }) => {
                println!(
                    "{}",
                    style(format!(":: {} updated to {}-{}", name, version, revision))
                        .green()
                        .bold()
                );
            }
            Ok(Outcome::Unchanged) => {}
            Err(err) => self.failed.push((name.to_string(), err)),
        }
    }
}

/// Process packages sequentially. A failure aborts only the package it
/// occurred in; the rest of the queue still runs and the summary carries
/// every failure for the final exit code.
fn run_packages(packages: &[&PackageSpec], opts: &UpdateOptions) -> RunSummary {
    let mut summary = RunSummary::default();
    for pkg in packages {
        let result = process_package(pkg, opts);
        summary.record(&pkg.name, result);
    }
    summary
}

/// Remove build artifacts. With `keep_cache`, downloaded assets survive and
/// only rendered repository clones (plus stale entries for packages no
/// longer configured) are deleted.
fn clean(conf: &Config, build_dir: &Path, keep_cache: bool) -> Result<()> {
    if !build_dir.exists() {
        return Ok(());
    }

    if !keep_cache {
        fs::remove_dir_all(build_dir)?;
        return Ok(());
    }

    for entry in fs::read_dir(build_dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if conf.package(&name).is_some() {
            let repo_dir = path.join("repo");
            if repo_dir.exists() {
                fs::remove_dir_all(repo_dir)?;
            }
        } else if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}
