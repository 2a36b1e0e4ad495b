//! Paperspace CLI
//!
//! Thin command-line front end over `paperspace-client`. Results are printed
//! to stdout as JSON; logs go to stderr. Ctrl-C cancels any in-flight wait.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use paperspace_client::{
    CallContext, CancellationToken, ClientConfig, MachineCreateConfig, MachineUpdateConfig,
    PaperspaceClient, StartupScriptCreateConfig, TargetState,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "paperspace")]
#[command(about = "Manage Paperspace machines and related resources")]
struct Cli {
    /// Give up on any single command after this many seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the user and team behind the configured API key
    Whoami,

    /// List custom templates
    Templates {
        /// Sort ascending by `dtCreated` or `name`
        #[arg(long)]
        sort_by: Option<String>,
    },

    /// Machine operations
    #[command(subcommand)]
    Machines(MachineCommands),

    /// Startup script operations
    #[command(subcommand)]
    Scripts(ScriptCommands),

    /// Private network operations
    #[command(subcommand)]
    Networks(NetworkCommands),

    /// Machine event operations
    #[command(subcommand)]
    Events(EventCommands),
}

#[derive(Subcommand)]
enum MachineCommands {
    /// List all machines
    List,

    /// Show one machine
    Get { id: String },

    /// Create a machine and wait for it to be provisioned
    Create(CreateMachineArgs),

    /// Update a machine and wait for its events to finish
    Update(UpdateMachineArgs),

    /// Start a machine and wait until it is ready
    Start { id: String },

    /// Stop a machine and wait until it is off
    Stop { id: String },

    /// Delete a machine and wait until it is gone
    Delete { id: String },
}

#[derive(Args)]
struct CreateMachineArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    machine_type: String,
    #[arg(long)]
    template_id: String,
    #[arg(long)]
    disk_size: i64,
    #[arg(long)]
    region: String,
    #[arg(long)]
    network_id: Option<String>,
    #[arg(long)]
    public_ip_type: Option<String>,
    #[arg(long)]
    startup_script_id: Option<String>,
    /// Start the machine once created and wait until it is ready
    #[arg(long)]
    start: bool,
}

#[derive(Args)]
struct UpdateMachineArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    machine_type: Option<String>,
    #[arg(long)]
    disk_size: Option<i64>,
    #[arg(long)]
    network_id: Option<String>,
    #[arg(long)]
    public_ip_type: Option<String>,
    #[arg(long)]
    auto_shutdown_enabled: Option<bool>,
    #[arg(long)]
    auto_shutdown_timeout: Option<i64>,
    #[arg(long)]
    auto_snapshot_enabled: Option<bool>,
    /// Reconcile to this state (`ready` or `off`), stopping first if the
    /// update resizes the machine
    #[arg(long)]
    state: Option<String>,
}

#[derive(Subcommand)]
enum ScriptCommands {
    /// List all startup scripts
    List,

    /// Show one startup script
    Get { id: String },

    /// Create a startup script from a file
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        file: PathBuf,
        /// Run only on first boot
        #[arg(long)]
        run_once: bool,
    },

    /// Delete a startup script and wait until it is gone
    Delete { id: String },
}

#[derive(Subcommand)]
enum NetworkCommands {
    /// Show one private network (`null` if there is none)
    Get { id: String },
}

#[derive(Subcommand)]
enum EventCommands {
    /// List machine events
    List {
        #[arg(long)]
        machine_id: Option<String>,
    },

    /// Count events by name
    Stats,

    /// Wait for one event to finish
    Wait { id: String },
}

#[derive(Serialize)]
struct Deleted<'a> {
    id: &'a str,
    deleted: bool,
}

fn output<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,paperspace_client=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    let (client, session) = PaperspaceClient::connect(&config)
        .await
        .context("Failed to authenticate with Paperspace")?;

    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let mut ctx = CallContext::new().with_cancellation(token);
    if let Some(secs) = cli.timeout_secs {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    match cli.command {
        Commands::Whoami => output(&session),
        Commands::Templates { sort_by } => {
            let templates = match sort_by {
                Some(key) => client.list_custom_templates_sorted_by(&ctx, &key).await?,
                None => client.list_custom_templates(&ctx, None).await?,
            };
            output(&templates)
        }
        Commands::Machines(command) => run_machine_command(&client, &ctx, command).await,
        Commands::Scripts(command) => run_script_command(&client, &ctx, command).await,
        Commands::Networks(NetworkCommands::Get { id }) => {
            output(&client.get_private_network(&id).await?)
        }
        Commands::Events(command) => run_event_command(&client, &ctx, command).await,
    }
}

async fn run_machine_command(
    client: &PaperspaceClient,
    ctx: &CallContext,
    command: MachineCommands,
) -> Result<()> {
    match command {
        MachineCommands::List => output(&client.list_machines(ctx).await?),
        MachineCommands::Get { id } => output(&client.get_machine(&id).await?),
        MachineCommands::Create(args) => {
            let config = MachineCreateConfig {
                name: args.name,
                machine_type: args.machine_type,
                template_id: args.template_id,
                disk_size: args.disk_size,
                region: args.region,
                network_id: args.network_id,
                public_ip_type: args.public_ip_type,
                startup_script_id: args.startup_script_id,
                start_on_create: args.start,
                ..Default::default()
            };
            output(&client.create_machine(ctx, &config).await?)
        }
        MachineCommands::Update(args) => {
            let update = MachineUpdateConfig {
                name: args.name,
                machine_type: args.machine_type,
                disk_size: args.disk_size,
                network_id: args.network_id,
                public_ip_type: args.public_ip_type,
                auto_shutdown_enabled: args.auto_shutdown_enabled,
                auto_shutdown_timeout: args.auto_shutdown_timeout,
                auto_snapshot_enabled: args.auto_snapshot_enabled,
                ..Default::default()
            };
            let machine = match args.state {
                Some(state) => {
                    let desired: TargetState = state.parse()?;
                    client
                        .apply_machine_changes(ctx, &args.id, &update, desired)
                        .await?
                }
                None => {
                    client.update_machine(ctx, &args.id, &update).await?;
                    client.get_machine(&args.id).await?
                }
            };
            output(&machine)
        }
        MachineCommands::Start { id } => output(&client.start_machine(ctx, &id).await?),
        MachineCommands::Stop { id } => output(&client.stop_machine(ctx, &id).await?),
        MachineCommands::Delete { id } => {
            client.delete_machine(ctx, &id).await?;
            output(&Deleted {
                id: &id,
                deleted: true,
            })
        }
    }
}

async fn run_script_command(
    client: &PaperspaceClient,
    ctx: &CallContext,
    command: ScriptCommands,
) -> Result<()> {
    match command {
        ScriptCommands::List => output(&client.list_startup_scripts(ctx).await?),
        ScriptCommands::Get { id } => output(&client.get_startup_script(&id).await?),
        ScriptCommands::Create {
            name,
            file,
            run_once,
        } => {
            let script = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let config = StartupScriptCreateConfig {
                name,
                script,
                is_run_once: run_once,
            };
            output(&client.create_startup_script(&config).await?)
        }
        ScriptCommands::Delete { id } => {
            client.delete_startup_script(ctx, &id).await?;
            output(&Deleted {
                id: &id,
                deleted: true,
            })
        }
    }
}

async fn run_event_command(
    client: &PaperspaceClient,
    ctx: &CallContext,
    command: EventCommands,
) -> Result<()> {
    match command {
        EventCommands::List { machine_id } => {
            output(&client.list_machine_events(ctx, machine_id.as_deref()).await?)
        }
        EventCommands::Stats => output(&client.machine_event_stats(ctx).await?),
        EventCommands::Wait { id } => output(&client.wait_for_event(ctx, &id).await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_update_parses_state_flag() {
        let cli = Cli::try_parse_from([
            "paperspace",
            "machines",
            "update",
            "psm1",
            "--disk-size",
            "100",
            "--state",
            "off",
        ])
        .unwrap();

        match cli.command {
            Commands::Machines(MachineCommands::Update(args)) => {
                assert_eq!(args.id, "psm1");
                assert_eq!(args.disk_size, Some(100));
                assert_eq!(args.state.as_deref(), Some("off"));
            }
            _ => panic!("expected machines update"),
        }
    }
}
