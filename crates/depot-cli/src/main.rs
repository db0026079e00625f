mod classpath;
mod install;
mod output;
mod progress;
mod session;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use session::GlobalArgs;

#[derive(Parser, Debug)]
#[command(name = "depot")]
#[command(about = "Resolve and install packages with their transitive dependencies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install packages and their dependencies
    Install(install::InstallArgs),

    /// Install packages and print the classpath
    #[command(alias = "cp")]
    Classpath(classpath::ClasspathArgs),

    /// Refresh an installed package from its source
    Update(update::UpdateArgs),
}

fn init_logging(global: &GlobalArgs) {
    let env = env_logger::Env::default().default_filter_or(global.verbosity().log_filter());
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    match cli.command {
        Commands::Install(args) => install::execute(args, &cli.global),
        Commands::Classpath(args) => classpath::execute(args, &cli.global),
        Commands::Update(args) => update::execute(args, &cli.global),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_install() {
        let cli = Cli::try_parse_from([
            "depot",
            "install",
            "maven://g:a:1",
            "git://example.com/r.git",
            "--scope",
            "compile",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.global.scope.as_deref(), Some("compile"));
        assert_eq!(cli.global.verbose, 2);
        match cli.command {
            Commands::Install(args) => assert_eq!(args.locators.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_classpath_alias_and_globals() {
        let cli = Cli::try_parse_from([
            "depot",
            "--package-root",
            "/tmp/pkgs",
            "cp",
            "--partial",
            "maven://g:a:1",
        ])
        .unwrap();

        assert_eq!(cli.global.package_root, Some(std::path::PathBuf::from("/tmp/pkgs")));
        assert!(matches!(cli.command, Commands::Classpath(ref args) if args.partial));
    }

    #[test]
    fn test_locator_required() {
        assert!(Cli::try_parse_from(["depot", "install"]).is_err());
        assert!(Cli::try_parse_from(["depot", "update"]).is_err());
    }
}
