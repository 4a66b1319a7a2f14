//! tondev command-line entry point.
//!
//! Wires the console terminal, settings and Ctrl-C cancellation to the
//! provisioning engine. Argument parsing lives here; everything else is in
//! `tondev-core`.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use tondev_core::binaries::{is_more_marker, InstallOptions};
use tondev_core::{
    format_table, ConsoleTerminal, Installer, ProgressLine, ProvisionSettings, SpawnOptions,
    TableOptions, Terminal,
};

const SETTINGS_FILE: &str = ".tondev/settings.json";

#[derive(Debug, Parser)]
#[command(name = "tondev", version, about = "TON developer toolchain provisioning")]
struct Cli {
    /// Settings file (defaults to ~/.tondev/settings.json when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the binary distribution origin.
    #[arg(long, global = true)]
    binaries_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List published versions of a tool.
    Versions { name: String },

    /// Download and install a binary from the distribution origin.
    Install {
        /// Source path on the origin; `{p}` becomes the platform name.
        source: String,
        /// Destination file.
        destination: PathBuf,
        #[arg(long)]
        executable: bool,
        /// File to chmod when it differs from the destination.
        #[arg(long)]
        adjusted_path: Option<PathBuf>,
        /// Register the binary through the package manager.
        #[arg(long, requires = "version")]
        global: bool,
        #[arg(long)]
        version: Option<String>,
    },

    /// Download a zip archive and extract it into a directory.
    Github { url: String, destination: PathBuf },

    /// Run a program, streaming its output.
    Run {
        #[arg(long)]
        cwd: Option<PathBuf>,
        program: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let terminal = ConsoleTerminal;

    if let Err(err) = run(cli, &terminal).await {
        terminal.write_error(&format!("\n{err:#}\n"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, terminal: &dyn Terminal) -> anyhow::Result<()> {
    let settings = load_settings(cli.config.as_deref(), cli.binaries_url)?;
    tracing::debug!("Using binaries origin {}", settings.binaries_url);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let installer = Installer::new(settings)?.with_cancellation(cancel);

    match cli.command {
        Commands::Versions { name } => {
            let mut progress = ProgressLine::new();
            progress.progress(terminal, &format!("Fetching {name} versions"));
            let versions = installer.client().load_binary_versions(&name).await?;
            progress.done(terminal);

            let mut rows = vec![vec!["Version".to_string(), String::new()]];
            for (i, version) in versions.iter().enumerate() {
                let note = if i == 0 && !is_more_marker(version) {
                    "newest"
                } else {
                    ""
                };
                rows.push(vec![version.clone(), note.to_string()]);
            }
            terminal.log(&format_table(
                &rows,
                TableOptions {
                    header_separator: true,
                },
            ));
        }
        Commands::Install {
            source,
            destination,
            executable,
            adjusted_path,
            global,
            version,
        } => {
            let options = InstallOptions {
                executable,
                adjusted_path,
                globally: global,
                version,
            };
            installer
                .download_from_binaries(terminal, &destination, &source, &options)
                .await?;
        }
        Commands::Github { url, destination } => {
            installer
                .download_from_github(terminal, &url, &destination)
                .await?;
        }
        Commands::Run { cwd, program, args } => {
            let options = SpawnOptions {
                cwd,
                ..SpawnOptions::default()
            };
            installer
                .runner()
                .run(&program, &args, &options, terminal)
                .await?;
        }
    }

    Ok(())
}

fn load_settings(
    explicit: Option<&Path>,
    binaries_url: Option<String>,
) -> anyhow::Result<ProvisionSettings> {
    let default_file = dirs::home_dir().map(|home| home.join(SETTINGS_FILE));
    let settings = match (explicit, default_file) {
        (Some(path), _) => ProvisionSettings::load(path)?,
        (None, Some(path)) if path.exists() => ProvisionSettings::load(&path)?,
        _ => ProvisionSettings::default(),
    };

    Ok(match binaries_url {
        Some(url) => settings.with_binaries_url(url),
        None => settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_install_requires_version() {
        let parsed = Cli::try_parse_from(["tondev", "install", "a.gz", "/tmp/a", "--global"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from([
            "tondev",
            "install",
            "a.gz",
            "/tmp/a",
            "--global",
            "--version",
            "1.0.0",
        ]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn run_keeps_hyphenated_args() {
        let cli = Cli::try_parse_from(["tondev", "run", "tar", "-xvf", "se.tar"]).unwrap();
        match cli.command {
            Commands::Run { program, args, .. } => {
                assert_eq!(program, "tar");
                assert_eq!(args, vec!["-xvf", "se.tar"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn binaries_url_flag_overrides_settings() {
        let settings =
            load_settings(None, Some("http://localhost:8080".to_string())).unwrap();
        assert_eq!(settings.binaries_url, "http://localhost:8080");
    }
}
