use anyhow::{Context, Result};
use clap::Parser;
use rig_acp_installer::detection::detect_install_method;
use rig_acp_installer::env::RealEnvironment;
use rig_acp_installer::npm::Npm;
use rig_acp_installer::process::SystemRunner;
use rig_acp_installer::{
    install_with_progress, uninstall_with, InstallMethod, InstallOptions, InstallResult, InstallState,
    InstallerConfig, KnownTool, ToolSpec, UninstallReport,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// rig-acp-installer - install AI coding agents without sudo
///
/// Installs an npm-distributed agent CLI into a location the current user
/// owns, adds it to PATH through the shell startup file, and checks that
/// it runs.
///
/// Log verbosity can be set with RIG_ACP_INSTALLER_LOG (e.g. "debug").
///
/// Examples:
///   rig-acp-installer install                  # Install Claude Code
///   rig-acp-installer --tool codex install     # Install the Codex CLI
///   rig-acp-installer uninstall --json
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Agent to manage (claude-code, codex, gemini, opencode)
    #[arg(
        long,
        short = 't',
        env = "RIG_ACP_INSTALLER_TOOL",
        default_value = "claude-code",
        global = true
    )]
    tool: KnownTool,

    /// npm package to install instead of the tool's own
    #[arg(long, value_name = "PACKAGE", global = true)]
    package: Option<String>,

    /// Command name the package provides
    #[arg(long, value_name = "NAME", global = true)]
    binary: Option<String>,

    /// Name used in the shell startup file markers
    #[arg(long = "name", value_name = "NAME", global = true)]
    display_name: Option<String>,

    /// Show npm output and progress
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install the agent
    Install(InstallArgs),

    /// Remove the agent and its PATH configuration
    Uninstall,

    /// Show the published version and the install method that would be used
    Check,
}

#[derive(clap::Args, Debug)]
struct InstallArgs {
    /// Reinstall and replace a file in the way of the command link
    #[arg(long)]
    force: bool,

    /// Do not edit shell startup files
    #[arg(long)]
    skip_path_update: bool,

    /// Install method (user-prefix, global-prefix, manual-local)
    #[arg(long, value_name = "METHOD")]
    method: Option<InstallMethod>,
}

impl Cli {
    fn tool_spec(&self) -> ToolSpec {
        let mut spec = self.tool.spec();
        if let Some(package) = &self.package {
            spec.package = package.clone();
        }
        if let Some(binary) = &self.binary {
            spec.binary = binary.clone();
        }
        if let Some(name) = &self.display_name {
            spec.display_name = name.clone();
        }
        spec
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = InstallerConfig::for_tool(cli.tool_spec());
    let env = RealEnvironment;
    let runner = SystemRunner;

    let success = match &cli.command {
        Commands::Install(args) => {
            let options = InstallOptions {
                verbose: cli.verbose,
                force: args.force,
                skip_path_update: args.skip_path_update,
                method_override: args.method,
            };
            let show_progress = cli.verbose && !cli.json;
            let result = install_with_progress(options, &config, &env, &runner, |state| {
                // The final state is reported with the result.
                if show_progress && state != InstallState::NotStarted && !state.is_terminal() {
                    eprintln!("{}...", state.description());
                }
            })
            .await;
            if cli.json {
                print_json(&result)?;
            } else {
                print_install(&config.tool, &result);
            }
            result.success
        }
        Commands::Uninstall => {
            let report = uninstall_with(&config, &env, &runner).await;
            if cli.json {
                print_json(&report)?;
            } else {
                print_uninstall(&config.tool, &report);
            }
            report.success
        }
        Commands::Check => {
            let npm = Npm::new(&runner, config.timeouts).verbose(cli.verbose);
            let method = detect_install_method(&env, &npm).await;
            let version = npm
                .available_version(&config.tool.package)
                .await
                .with_context(|| format!("querying the published version of {}", config.tool.package))?;
            if cli.json {
                print_json(&serde_json::json!({
                    "package": config.tool.package,
                    "available_version": version,
                    "method": method,
                }))?;
            } else {
                println!("{} {version} is available", config.tool.package);
                println!("Install method: {method}");
            }
            true
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("RIG_ACP_INSTALLER_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_install(tool: &ToolSpec, result: &InstallResult) {
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }

    if result.success {
        let version = result
            .version
            .as_ref()
            .map(|v| format!(" {v}"))
            .unwrap_or_default();
        println!("Installed {}{version} ({})", tool.display_name, result.method);
        if let Some(bin) = &result.bin_path {
            println!("  command: {}", bin.display());
        }
        if result.path_updated {
            if let Some(file) = &result.path_config_file {
                println!("  PATH updated in {}", file.display());
                println!("  Run `source {}` or open a new terminal", file.display());
            }
        }
    } else {
        eprintln!(
            "Failed to install {}: {}",
            tool.display_name,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    if let Some(fix) = &result.remediation {
        if result.success {
            println!("  Add it to PATH yourself: {fix}");
        } else {
            eprintln!("  To fix: {fix}");
        }
    }
}

fn print_uninstall(tool: &ToolSpec, report: &UninstallReport) {
    if !report.success {
        eprintln!(
            "Failed to uninstall {}: {}",
            tool.display_name,
            report.error.as_deref().unwrap_or("unknown error")
        );
        return;
    }

    println!("Uninstalled {}", tool.display_name);
    for path in &report.removed {
        println!("  removed {}", path.display());
    }
    for file in &report.profiles_cleaned {
        println!("  cleaned PATH configuration from {}", file.display());
    }
    for failure in &report.failures {
        eprintln!("warning: {failure}");
    }
}
