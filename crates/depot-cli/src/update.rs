//! Update command - refresh an installed package in place.

use anyhow::Result;
use clap::Args;

use crate::session::{GlobalArgs, Session};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Locator of the package to refresh
    #[arg(value_name = "LOCATOR")]
    pub locator: String,
}

pub fn execute(args: UpdateArgs, global: &GlobalArgs) -> Result<i32> {
    let session = Session::new(global)?;

    let resolution = session.resolve(&format!("Updating {}", args.locator), |system| {
        system.update(&args.locator)
    });
    Ok(session.report(&resolution))
}
