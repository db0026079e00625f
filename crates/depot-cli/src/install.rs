//! Install command - resolve and fetch packages and their dependencies.

use anyhow::Result;
use clap::Args;

use crate::session::{GlobalArgs, Session};

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Package locators, e.g. "maven://org.slf4j:slf4j-api:2.0.9"
    #[arg(value_name = "LOCATORS", required = true)]
    pub locators: Vec<String>,
}

pub fn execute(args: InstallArgs, global: &GlobalArgs) -> Result<i32> {
    let session = Session::new(global)?;
    let locators: Vec<&str> = args.locators.iter().map(String::as_str).collect();

    let resolution = session.resolve("Resolving dependencies", |system| {
        system.install_all(&locators)
    });
    Ok(session.report(&resolution))
}
