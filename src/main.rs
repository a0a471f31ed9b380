use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use dhcpconf::{Config, Family, HostPatch, HostRecord, HostStore, InterfaceStore};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage host reservations
    #[command(subcommand)]
    Hosts(HostsCommand),
    /// Manage the interfaces the DHCP server listens on
    #[command(subcommand)]
    Interfaces(InterfacesCommand),
    /// Log a summary whenever either file changes
    Watch,
}

#[derive(Subcommand, Debug)]
enum HostsCommand {
    /// List all host reservations
    List,
    /// Show one host reservation
    Show { name: String },
    /// Append a new host reservation
    Add(HostFields),
    /// Change fields of an existing host reservation
    Update {
        name: String,
        #[command(flatten)]
        patch: PatchFields,
    },
    /// Remove a host reservation
    Delete { name: String },
}

#[derive(ClapArgs, Debug)]
struct HostFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    hardware_ethernet: String,
    #[arg(long)]
    option_routers: String,
    #[arg(long)]
    option_subnet_mask: String,
    #[arg(long)]
    fixed_address: String,
    #[arg(long)]
    option_domain_name_servers: String,
}

#[derive(ClapArgs, Debug)]
struct PatchFields {
    /// Rename the host
    #[arg(long = "name")]
    new_name: Option<String>,
    #[arg(long)]
    hardware_ethernet: Option<String>,
    #[arg(long)]
    option_routers: Option<String>,
    #[arg(long)]
    option_subnet_mask: Option<String>,
    #[arg(long)]
    fixed_address: Option<String>,
    #[arg(long)]
    option_domain_name_servers: Option<String>,
}

#[derive(Subcommand, Debug)]
enum InterfacesCommand {
    /// List v4 and v6 interfaces
    List,
    /// Add an interface to INTERFACESv4 or INTERFACESv6
    Add { family: Family, interface: String },
    /// Remove an interface from INTERFACESv4 or INTERFACESv6
    Remove { family: Family, interface: String },
}

impl From<HostFields> for HostRecord {
    fn from(f: HostFields) -> Self {
        HostRecord {
            name: f.name,
            hardware_ethernet: f.hardware_ethernet,
            option_routers: f.option_routers,
            option_subnet_mask: f.option_subnet_mask,
            fixed_address: f.fixed_address,
            option_domain_name_servers: f.option_domain_name_servers,
        }
    }
}

impl From<PatchFields> for HostPatch {
    fn from(f: PatchFields) -> Self {
        HostPatch {
            name: f.new_name,
            hardware_ethernet: f.hardware_ethernet,
            option_routers: f.option_routers,
            option_subnet_mask: f.option_subnet_mask,
            fixed_address: f.fixed_address,
            option_domain_name_servers: f.option_domain_name_servers,
        }
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_hosts(store: &HostStore, command: HostsCommand) -> anyhow::Result<()> {
    match command {
        HostsCommand::List => print_json(&json!({ "hosts": store.list() })),
        HostsCommand::Show { name } => {
            let host = store.get(&name)?;
            print_json(&json!(host))
        }
        HostsCommand::Add(fields) => {
            let record = HostRecord::from(fields);
            store
                .insert(&record)
                .with_context(|| format!("Failed to add host {}", record.name))?;
            print_json(&json!({ "message": "Host added successfully" }))
        }
        HostsCommand::Update { name, patch } => {
            let host = store
                .update(&name, &patch.into())
                .with_context(|| format!("Failed to update host {}", name))?;
            print_json(&json!({ "message": "Host updated successfully", "host": host }))
        }
        HostsCommand::Delete { name } => {
            store
                .delete(&name)
                .with_context(|| format!("Failed to delete host {}", name))?;
            print_json(&json!({ "message": "Host deleted successfully" }))
        }
    }
}

fn run_interfaces(store: &InterfaceStore, command: InterfacesCommand) -> anyhow::Result<()> {
    match command {
        InterfacesCommand::List => {
            let ifaces = store.read()?;
            print_json(&json!({
                "interfaces": { "v4": ifaces.v4.members, "v6": ifaces.v6.members }
            }))
        }
        InterfacesCommand::Add { family, interface } => {
            store
                .add(family, &interface)
                .with_context(|| format!("Failed to add interface {}", interface))?;
            print_json(&json!({
                "message": format!("Interface {} added to INTERFACES{} successfully.", interface, family)
            }))
        }
        InterfacesCommand::Remove { family, interface } => {
            store
                .remove(family, &interface)
                .with_context(|| format!("Failed to delete interface {}", interface))?;
            print_json(&json!({
                "message": format!("Interface {} removed from INTERFACES{} successfully.", interface, family)
            }))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let config = Config::resolve(args.config.as_deref())?;
    log::debug!("Using config {:?}", config);

    let hosts = Arc::new(HostStore::new(config.hosts_file.clone()));
    let interfaces = Arc::new(InterfaceStore::new(config.interfaces_file.clone()));

    match args.command {
        Command::Hosts(command) => run_hosts(&hosts, command),
        Command::Interfaces(command) => run_interfaces(&interfaces, command),
        Command::Watch => {
            let interval = Duration::from_secs(config.poll_interval_secs.max(1));
            tokio::select! {
                _ = dhcpconf::watch::run(hosts, interfaces, interval) => {}
                _ = tokio::signal::ctrl_c() => log::info!("Shutting down"),
            }
            Ok(())
        }
    }
}
