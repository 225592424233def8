//! Host commands (listing and maintenance).

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::output::{print_output, print_success, OutputFormat};

use super::CommandContext;

/// Host commands.
#[derive(Debug, Args)]
pub struct HostsCommand {
    #[command(subcommand)]
    command: HostsSubcommand,
}

#[derive(Debug, Subcommand)]
enum HostsSubcommand {
    /// List hosts, optionally filtered by state.
    List(ListHostsArgs),

    /// Start maintenance: UP hosts become DRAINING.
    Drain(HostnamesArgs),

    /// Take drained hosts down: DRAINING hosts become DOWN.
    Down(HostnamesArgs),

    /// Complete maintenance: DOWN hosts become UP.
    Up(HostnamesArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StateArg {
    Up,
    Draining,
    Down,
}

impl StateArg {
    fn as_str(self) -> &'static str {
        match self {
            StateArg::Up => "up",
            StateArg::Draining => "draining",
            StateArg::Down => "down",
        }
    }
}

#[derive(Debug, Args)]
struct ListHostsArgs {
    /// Only show hosts in this state (repeatable).
    #[arg(long = "state", value_enum)]
    states: Vec<StateArg>,
}

#[derive(Debug, Args)]
struct HostnamesArgs {
    /// Hostnames.
    #[arg(required = true)]
    hostnames: Vec<String>,
}

impl HostsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            HostsSubcommand::List(args) => list_hosts(ctx, args).await,
            HostsSubcommand::Drain(args) => drain_hosts(ctx, args).await,
            HostsSubcommand::Down(args) => down_hosts(ctx, args).await,
            HostsSubcommand::Up(args) => up_hosts(ctx, args).await,
        }
    }
}

/// Host as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
struct HostResponse {
    #[tabled(rename = "Hostname")]
    hostname: String,

    #[tabled(rename = "IP")]
    ip: String,

    #[tabled(rename = "State", display = "display_state")]
    state: String,
}

fn display_state(state: &str) -> String {
    match state {
        "up" => state.green().to_string(),
        "draining" => state.yellow().to_string(),
        "down" => state.red().to_string(),
        _ => state.to_string(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HostsResponse {
    hosts: Vec<HostResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HostnamesBody {
    hostnames: Vec<String>,
}

fn list_path(states: &[StateArg]) -> String {
    if states.is_empty() {
        return "/v1/hosts".to_string();
    }
    let states: Vec<&str> = states.iter().map(|state| state.as_str()).collect();
    format!("/v1/hosts?states={}", states.join(","))
}

async fn list_hosts(ctx: CommandContext, args: ListHostsArgs) -> Result<()> {
    let client = ctx.client()?;
    let response: HostsResponse = client.get(&list_path(&args.states)).await?;
    print_output(&response.hosts, ctx.format);
    Ok(())
}

async fn drain_hosts(ctx: CommandContext, args: HostnamesArgs) -> Result<()> {
    let client = ctx.client()?;
    let response: HostsResponse = client
        .post(
            "/v1/hosts/maintenance/start",
            &HostnamesBody {
                hostnames: args.hostnames,
            },
        )
        .await?;

    if matches!(ctx.format, OutputFormat::Table) {
        print_success(&format!("{} host(s) draining", response.hosts.len()));
    }
    print_output(&response.hosts, ctx.format);
    Ok(())
}

async fn down_hosts(ctx: CommandContext, args: HostnamesArgs) -> Result<()> {
    let client = ctx.client()?;
    let response: HostsResponse = client
        .post(
            "/v1/hosts/maintenance/drained",
            &HostnamesBody {
                hostnames: args.hostnames,
            },
        )
        .await?;

    if matches!(ctx.format, OutputFormat::Table) {
        print_success(&format!("{} host(s) down", response.hosts.len()));
    }
    print_output(&response.hosts, ctx.format);
    Ok(())
}

async fn up_hosts(ctx: CommandContext, args: HostnamesArgs) -> Result<()> {
    let client = ctx.client()?;
    let response: HostnamesBody = client
        .post(
            "/v1/hosts/maintenance/complete",
            &HostnamesBody {
                hostnames: args.hostnames,
            },
        )
        .await?;

    match ctx.format {
        OutputFormat::Table => print_success(&format!(
            "maintenance complete for {}",
            response.hostnames.join(", ")
        )),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        ),
    }
    Ok(())
}
