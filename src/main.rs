use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use toolman::commands::{self, config::Config};
use toolman::report::{ansi_enabled, init_colors};
use toolman::runtime::RealRuntime;

/// toolman - multi-version CLI tool manager
///
/// Installs prebuilt command-line tools described by recipes, keeps several
/// versions side by side, and links the active one into a single bin
/// directory.
///
/// If the GITHUB_TOKEN environment variable is set, it is used for GitHub
/// API requests.
///
/// Examples:
///   toolman add rg fd@8.7.0     # Install the latest rg and fd 8.7.0
///   toolman switch rg 13.0.0    # Activate another installed rg
///   toolman run node:npm -v     # Run npm from the active node
#[derive(Parser, Debug)]
#[command(author, version = env!("TOOLMAN_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root directory (defaults to ~/.toolman)
    #[arg(
        long = "root",
        short = 'r',
        env = "TOOLMAN_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub root: Option<PathBuf>,

    /// Recipe repository to search; repeatable. Defaults to <root>/recipes/*
    #[arg(long = "recipes", value_name = "DIR", global = true)]
    pub recipes: Vec<PathBuf>,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "github-api-url", value_name = "URL", global = true)]
    pub github_api_url: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[arg(long = "timeout", value_name = "SECS", default_value_t = 300, global = true)]
    pub timeout: u64,

    /// Install at most this many packages at once
    #[arg(long = "jobs", short = 'j', value_name = "N", global = true)]
    pub jobs: Option<usize>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install packages ("pkg" or "pkg@version")
    Add(AddArgs),

    /// Install the latest version and remove the one it replaces
    Upgrade(UpgradeArgs),

    /// Remove an installed version
    Remove(RemoveArgs),

    /// Switch the active version of a package
    Switch(SwitchArgs),

    /// Show the active version of a package
    Using(UsingArgs),

    /// Run an installed binary ("pkg", "pkg@version" or "pkg@version:bin")
    Run(RunArgs),

    /// List installed packages
    List,

    /// Print the toolman version
    Version,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Make the new versions active even if another version is in use
    #[arg(long)]
    pub switch: bool,

    #[arg(value_name = "PKG[@VERSION]", required = true)]
    pub packages: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct UpgradeArgs {
    /// Packages to upgrade (defaults to every active package)
    #[arg(value_name = "PKG")]
    pub packages: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    pub package: String,

    /// Version or stem to remove; required when several are installed
    pub version: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SwitchArgs {
    pub package: String,

    /// Version or stem to activate
    pub version: String,
}

#[derive(clap::Args, Debug)]
pub struct UsingArgs {
    pub package: String,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Package, optional version, and optional binary name
    #[arg(value_name = "PKG[@VERSION][:BIN]")]
    pub target: String,

    /// Arguments passed to the binary
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    fn config(&self, ansi: bool) -> Config {
        Config {
            root: self.root.clone(),
            recipe_dirs: self.recipes.clone(),
            github_api_url: self.github_api_url.clone(),
            timeout: Duration::from_secs(self.timeout),
            jobs: self.jobs,
            ansi,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let ansi = ansi_enabled(std::env::var_os("NO_COLOR").is_some());
    init_colors(ansi);
    let config = cli.config(ansi);
    let runtime = RealRuntime;

    let code = match &cli.command {
        Commands::Add(args) => commands::add(runtime, &config, &args.packages, args.switch).await?,
        Commands::Upgrade(args) => commands::upgrade(runtime, &config, &args.packages).await?,
        Commands::Remove(args) => {
            commands::remove(runtime, &config, &args.package, args.version.as_deref())?;
            0
        }
        Commands::Switch(args) => {
            commands::switch(runtime, &config, &args.package, &args.version)?;
            0
        }
        Commands::Using(args) => {
            commands::using(runtime, &config, &args.package)?;
            0
        }
        Commands::Run(args) => commands::run(runtime, &config, &args.target, &args.args)?,
        Commands::List => {
            commands::list(runtime, &config)?;
            0
        }
        Commands::Version => {
            println!("toolman {}", env!("TOOLMAN_VERSION"));
            0
        }
    };
    Ok(ExitCode::from(code as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_add_parsing() {
        let cli = Cli::try_parse_from(["toolman", "add", "rg", "fd@8.7.0", "--switch"]).unwrap();
        match cli.command {
            Commands::Add(args) => {
                assert_eq!(args.packages, vec!["rg", "fd@8.7.0"]);
                assert!(args.switch);
            }
            _ => panic!("Expected Add command"),
        }
        assert_eq!(cli.root, None);
        assert_eq!(cli.timeout, 300);
    }

    #[test]
    fn test_cli_add_requires_packages() {
        assert!(Cli::try_parse_from(["toolman", "add"]).is_err());
    }

    #[test]
    fn test_cli_remove_parsing() {
        let cli = Cli::try_parse_from(["toolman", "remove", "rg", "rg-13.0.0"]).unwrap();
        match cli.command {
            Commands::Remove(args) => {
                assert_eq!(args.package, "rg");
                assert_eq!(args.version.as_deref(), Some("rg-13.0.0"));
            }
            _ => panic!("Expected Remove command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "toolman",
            "--root",
            "/tmp/tm",
            "--recipes",
            "/a",
            "--recipes",
            "/b",
            "list",
            "--jobs",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/tm")));
        assert_eq!(cli.recipes, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(cli.jobs, Some(4));

        let config = cli.config(false);
        assert_eq!(config.recipe_dirs.len(), 2);
        assert!(!config.ansi);
    }

    #[test]
    fn test_cli_upgrade_without_packages() {
        let cli = Cli::try_parse_from(["toolman", "upgrade"]).unwrap();
        match cli.command {
            Commands::Upgrade(args) => assert!(args.packages.is_empty()),
            _ => panic!("Expected Upgrade command"),
        }
    }

    #[test]
    fn test_cli_run_keeps_trailing_args() {
        let cli = Cli::try_parse_from(["toolman", "run", "node@17.0.0:npm", "--version", "-x", "a"])
            .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.target, "node@17.0.0:npm");
                assert_eq!(args.args, vec!["--version", "-x", "a"]);
            }
            _ => panic!("Expected Run command"),
        }

        let cli = Cli::try_parse_from(["toolman", "run", "rg"]).unwrap();
        match cli.command {
            Commands::Run(args) => assert!(args.args.is_empty()),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["toolman", "rg"]).is_err());
    }
}
