//! Shared setup of every command: configuration, output and the resolver.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;

use depot_pm::{Config, RepositorySystem, Resolution, ScopeSet};

use crate::output::{Output, Verbosity};
use crate::progress::ProgressManager;

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory packages are installed into (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    pub package_root: Option<PathBuf>,

    /// Comma separated dependency scopes to follow (e.g. "compile,runtime")
    #[arg(long, global = true, value_name = "SCOPES")]
    pub scope: Option<String>,

    /// Working directory (where depot.json is read from)
    #[arg(short = 'd', long, global = true, default_value = ".")]
    pub working_dir: PathBuf,

    /// Disable progress output
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Do not output any message
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }

    /// Configuration from all sources, with command line overrides applied.
    pub fn config(&self) -> Result<Config> {
        let working_dir = self
            .working_dir
            .canonicalize()
            .context("Failed to resolve working directory")?;
        let mut config =
            Config::build(Some(&working_dir), true).context("Failed to load configuration")?;

        if let Some(root) = &self.package_root {
            config.set_package_root(root);
        }
        if let Some(scopes) = &self.scope {
            let scopes = ScopeSet::parse_list(scopes)
                .with_context(|| format!("Invalid --scope value '{}'", scopes))?;
            config.set_scopes(scopes);
        }
        Ok(config)
    }
}

pub struct Session {
    pub system: RepositorySystem,
    pub output: Arc<Output>,
    progress: ProgressManager,
}

impl Session {
    pub fn new(args: &GlobalArgs) -> Result<Self> {
        let output = Arc::new(Output::new(args.verbosity()));
        let config = args.config()?;
        log::debug!("Installing into {}", config.get_package_root().display());

        let mut system =
            RepositorySystem::new(config).context("Failed to initialise the resolver")?;
        system.set_message_handler(output.clone());

        let progress = ProgressManager::new(!args.no_progress && !output.is_quiet());
        Ok(Self {
            system,
            output,
            progress,
        })
    }

    /// Run `resolve` behind a spinner.
    pub fn resolve<F>(&self, message: &str, resolve: F) -> Resolution
    where
        F: FnOnce(&RepositorySystem) -> Resolution,
    {
        self.output.set_spinner(self.progress.create_spinner(message));
        let resolution = resolve(&self.system);
        self.output.clear_spinner();
        resolution
    }

    /// Print the outcome of a pass; returns the process exit code.
    pub fn report(&self, resolution: &Resolution) -> i32 {
        let fetched = resolution.packages.iter().filter(|p| p.fetched).count();
        for package in resolution.packages.iter().filter(|p| !p.fetched) {
            self.output
                .verbose(&format!("  {} is up to date ({})", package.name, package.locator));
        }

        if resolution.is_success() {
            self.output.success(&format!(
                "{} package(s) resolved, {} fetched",
                resolution.packages.len(),
                fetched
            ));
            return 0;
        }

        for failure in &resolution.failures {
            self.output.error(&format!(
                "{} could not be installed: {}",
                style(&failure.package).bold(),
                failure.reason
            ));
        }
        1
    }
}
