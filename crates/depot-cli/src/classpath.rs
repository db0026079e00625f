//! Classpath command - install packages and print the resulting classpath.

use anyhow::{Context, Result};
use clap::Args;

use crate::session::{GlobalArgs, Session};

#[derive(Args, Debug)]
pub struct ClasspathArgs {
    /// Package locators to resolve
    #[arg(value_name = "LOCATORS", required = true)]
    pub locators: Vec<String>,

    /// Print the classpath even when some packages failed
    #[arg(long)]
    pub partial: bool,
}

pub fn execute(args: ClasspathArgs, global: &GlobalArgs) -> Result<i32> {
    let session = Session::new(global)?;
    let locators: Vec<&str> = args.locators.iter().map(String::as_str).collect();

    let resolution = session.resolve("Resolving classpath", |system| {
        system.install_all(&locators)
    });
    let code = session.report(&resolution);

    if code == 0 || args.partial {
        let classpath = resolution
            .classpath_string()
            .context("Failed to assemble classpath")?;
        println!("{}", classpath);
    }
    Ok(code)
}
