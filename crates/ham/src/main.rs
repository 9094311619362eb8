mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use ham_cloud::CloudGateway;
use ham_cloud_openstack::{OpenStackCli, OpenStackGateway};
use ham_core::{BlueprintRegistry, CoreError, Project};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ham")]
#[command(about = "Launch (mostly trained) monkeys into the cloud.", long_about = None)]
#[command(version)]
struct Cli {
    /// The project config directory
    #[arg(short, long = "project-dir", env = "HAM_PROJECT_ROOT", global = true)]
    project_dir: Option<PathBuf>,

    /// Named cloud from clouds.yaml for the openstack CLI
    #[arg(long = "os-cloud", global = true)]
    os_cloud: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new ham project
    Init,
    /// List all environments of the project
    List,
    /// Status of an environment, or connection info for one server
    Status {
        /// The name of the environment
        name: Option<String>,
        /// Get info on a server
        server: Option<String>,
    },
    /// List the blueprints available to create
    Blueprints,
    /// Create a new environment
    Create {
        /// The name of the environment
        name: String,
        /// Extra args for the project blueprint
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Bring up the servers in an environment
    Build {
        /// The name of the environment
        name: Option<String>,
    },
    /// Select an environment for subsequent commands
    Workon {
        /// The name of the environment (omit to clear the selection)
        name: Option<String>,
    },
    /// Wait for an environment to finish builds
    Wait {
        /// The name of the environment
        name: Option<String>,
        /// Give up after this many seconds (overrides [wait] timeout)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Run fab with the environment's fabfile
    Fab {
        /// The name of the environment
        #[arg(allow_hyphen_values = true)]
        name: Option<String>,
        /// fab command line args
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "...")]
        args: Vec<String>,
    },
    /// Terminate the existing instances
    Teardown {
        /// The name of the environment
        name: Option<String>,
    },
    /// Destroy the environment files
    Delete {
        /// The name of the environment
        name: Option<String>,
    },
    /// Check the compute gateway credentials
    Auth,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => Ok(code),
        Err(e) => match e.downcast_ref::<CoreError>() {
            Some(err) => {
                eprintln!("{} {}", "ERROR:".red().bold(), err);
                Ok(ExitCode::FAILURE)
            }
            None => Err(e),
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let project_root = ham_config::resolve_project_root(cli.project_dir.as_deref())?;
    let mut cli_wrapper = OpenStackCli::new();
    if let Some(cloud) = cli.os_cloud.as_deref() {
        cli_wrapper = cli_wrapper.with_cloud(cloud);
    }
    let gateway: Arc<dyn CloudGateway> = Arc::new(OpenStackGateway::with_cli(cli_wrapper));
    let mut project = Project::open(project_root, gateway, BlueprintRegistry::builtin())?;

    match cli.command {
        Commands::Init => commands::project::init(&mut project)?,
        Commands::List => commands::project::list(&project),
        Commands::Status { name, server } => {
            commands::status::handle(&mut project, name.as_deref(), server.as_deref()).await?
        }
        Commands::Blueprints => commands::project::blueprints(&project),
        Commands::Create { name, args } => commands::project::create(&mut project, &name, &args)?,
        Commands::Build { name } => commands::lifecycle::build(&mut project, name.as_deref()).await?,
        Commands::Workon { name } => commands::project::workon(&mut project, name.as_deref())?,
        Commands::Wait { name, timeout } => {
            commands::lifecycle::wait(&mut project, name.as_deref(), timeout).await?
        }
        Commands::Fab { name, args } => {
            return commands::fab::handle(&project, name, args).await;
        }
        Commands::Teardown { name } => {
            commands::lifecycle::teardown(&project, name.as_deref()).await?
        }
        Commands::Delete { name } => commands::lifecycle::delete(&mut project, name.as_deref()).await?,
        Commands::Auth => return commands::auth::handle(&project).await,
    }

    Ok(ExitCode::SUCCESS)
}
