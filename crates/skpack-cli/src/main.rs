mod commands;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use commands::exit_code_for;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "skpack",
    version,
    about = "Assemble Skipper packages from templated resources and publish them once"
)]
struct Cli {
    /// Path to the project manifest.
    #[arg(short, long, default_value = "skpack.toml", global = true)]
    project: PathBuf,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Settings that override `[package]` and `[properties]` in the manifest.
#[derive(Debug, Clone, Default, Args)]
pub struct PackageArgs {
    /// Directory with project files that replace built-in resources
    /// (relative to the current directory).
    #[arg(long)]
    override_dir: Option<PathBuf>,
    /// Working directory for the assembled tree and the archive
    /// (relative to the current directory).
    #[arg(long)]
    work_dir: Option<PathBuf>,
    /// Archive format: zip or tar.gz.
    #[arg(long)]
    format: Option<String>,
    /// Extra template variable, as key=value. May be repeated.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
}

/// Settings that override `[remote]` in the manifest.
#[derive(Debug, Clone, Default, Args)]
pub struct RemoteArgs {
    /// Repository API URL, e.g. http://localhost:7577/api.
    #[arg(long)]
    remote: Option<String>,
    /// Target repository name within the remote.
    #[arg(long)]
    repo: Option<String>,
    /// Bearer token for the remote (overrides ~/.config/skpack/remote.json).
    #[arg(long)]
    token: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a starter skpack.toml.
    Init {
        /// Project directory.
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Package name (defaults to the directory name).
        #[arg(long)]
        name: Option<String>,
        /// Initial package version.
        #[arg(long = "package-version", default_value = "0.1.0")]
        package_version: String,
        /// Copy the built-in templates into the override directory.
        #[arg(long, default_value_t = false)]
        with_templates: bool,
    },
    /// Merge, filter and archive the package.
    Package {
        #[command(flatten)]
        package: PackageArgs,
        /// Fail when any file could not be scanned or filtered.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Upload the packaged archive unless this version is already published.
    Publish {
        #[command(flatten)]
        package: PackageArgs,
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Package, then publish.
    Deploy {
        #[command(flatten)]
        package: PackageArgs,
        #[command(flatten)]
        remote: RemoteArgs,
        /// Fail when any file could not be scanned or filtered.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// List the entries of a package archive.
    Inspect {
        /// Archive to list (defaults to the project's packaged archive).
        archive: Option<PathBuf>,
        #[command(flatten)]
        package: PackageArgs,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SKPACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let json_output = cli.json;
    let manifest = cli.project;

    let result = match cli.command {
        Commands::Init {
            dir,
            name,
            package_version,
            with_templates,
        } => commands::init::run(
            &dir,
            name.as_deref(),
            &package_version,
            with_templates,
            json_output,
        ),
        Commands::Package { package, strict } => {
            commands::package::run(&manifest, &package, strict, json_output)
        }
        Commands::Publish { package, remote } => {
            commands::publish::run(&manifest, &package, &remote, json_output)
        }
        Commands::Deploy {
            package,
            remote,
            strict,
        } => commands::deploy::run(&manifest, &package, &remote, strict, json_output),
        Commands::Inspect { archive, package } => {
            commands::inspect::run(&manifest, archive.as_deref(), &package, json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}
