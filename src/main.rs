use anyhow::{Context, Result};
use clap::Parser;
use gdsdk::runtime::{RealRuntime, Runtime, absolutize};
use gdsdk::{Environment, LogObserver, Platform, SemanticVersion};
use std::path::PathBuf;

/// gdsdk - Godot engine release locator
///
/// Derives download URLs, export template folders and executable locations
/// for a Godot version on the current operating system.
///
/// Examples:
///   gdsdk url 4.2.1 --mono            # Engine download for the .NET build
///   gdsdk templates-path 4.3-rc2      # Where export templates are installed
///   gdsdk find-executables ./godot    # Runnable binaries in an extracted archive
#[derive(Parser, Debug)]
#[command(author, version = env!("GDSDK_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Operating system to derive names for (windows, macos, linux)
    #[arg(long = "os", value_name = "OS", global = true)]
    pub os: Option<String>,

    /// User data directory holding export templates (also via GDSDK_DATA_DIR)
    #[arg(
        long = "data-dir",
        env = "GDSDK_DATA_DIR",
        value_name = "PATH",
        global = true
    )]
    pub data_dir: Option<PathBuf>,

    /// Release mirror URL (defaults to the official download server)
    #[arg(
        long = "download-url",
        env = "GDSDK_DOWNLOAD_URL",
        value_name = "URL",
        global = true
    )]
    pub download_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the download URL of the engine or its export templates
    Url(UrlArgs),

    /// Print the local export templates directory for a version
    TemplatesPath(TemplatesPathArgs),

    /// List the runnable engine binaries under a directory
    FindExecutables(FindExecutablesArgs),

    /// Describe the selected platform and its archive layout
    Info(InfoArgs),
}

#[derive(clap::Args, Debug)]
pub struct UrlArgs {
    /// Engine version, e.g. 4.2.1 or 4.3-rc2
    #[arg(value_name = "VERSION")]
    pub version: SemanticVersion,

    /// Use the .NET (mono) build
    #[arg(long)]
    pub mono: bool,

    /// Export templates instead of the engine
    #[arg(long)]
    pub templates: bool,
}

#[derive(clap::Args, Debug)]
pub struct TemplatesPathArgs {
    #[arg(value_name = "VERSION")]
    pub version: SemanticVersion,

    #[arg(long)]
    pub mono: bool,
}

#[derive(clap::Args, Debug)]
pub struct FindExecutablesArgs {
    /// Extracted installation directory
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Print the matches as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    /// Also show the archive layout of this version
    #[arg(value_name = "VERSION")]
    pub version: Option<SemanticVersion>,

    #[arg(long)]
    pub mono: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    run(cli, RealRuntime).await
}

async fn run<R: Runtime>(cli: Cli, runtime: R) -> Result<()> {
    let platform = Platform::resolve(&runtime, cli.os.as_deref(), cli.data_dir)?;
    let cwd = runtime.current_dir()?;
    let mut env = Environment::new(platform, runtime);
    if let Some(url) = cli.download_url {
        env = env.with_download_prefix(url);
    }

    match cli.command {
        Commands::Url(args) => {
            println!("{}", env.download_url(&args.version, args.mono, args.templates));
        }
        Commands::TemplatesPath(args) => {
            let path = env.export_templates_local_path(&args.version, args.mono);
            println!("{}", path.display());
        }
        Commands::FindExecutables(args) => {
            let root = absolutize(&cwd, &args.dir);
            let found = env
                .find_executables_recursively(&root, &LogObserver)
                .await
                .with_context(|| format!("Failed to search {}", root.display()))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                for file in &found {
                    println!("{}", file.path.display());
                }
            }
        }
        Commands::Info(args) => print_info(&env, args.version.as_ref(), args.mono),
    }
    Ok(())
}

fn print_info<R: Runtime>(env: &Environment<R>, version: Option<&SemanticVersion>, mono: bool) {
    use gdsdk::PlatformSpec;

    let platform = env.platform();
    println!("platform: {}", platform);
    println!(
        "export templates: {}",
        platform.export_templates_base_path().display()
    );
    println!("download server: {}", env.download_prefix());

    let Some(version) = version else {
        return;
    };
    println!("version: {}", version);
    println!("engine: {}", env.artifact_filename(version, mono, false));
    println!("templates: {}", env.artifact_filename(version, mono, true));
    println!(
        "executable: {}",
        platform.executable_path(version, mono).display()
    );
    if let Some(debug) = platform.dotnet_debug_path(version, mono) {
        println!("dotnet debug: {}", debug.display());
    }
    if let Some(release) = platform.dotnet_release_path(version, mono) {
        println!("dotnet release: {}", release.display());
    }
}
