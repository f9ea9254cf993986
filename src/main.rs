use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::info;
use sshto_refresh::{workflow, Ec2Inventory, Settings};

#[derive(Parser)]
#[command(
    name = "sshto-refresh",
    version,
    about = "Create config for ssh-to via AWS"
)]
struct Cli {
    /// Username that will be used to ssh instances
    #[arg(long, global = true, default_value = "ubuntu")]
    ssh_user: String,

    /// Settings file overriding the network id, regions and polling policy
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the role-grouped server list for the whole network
    Create {
        /// Output to final-servers.json instead
        #[arg(long = "final")]
        final_servers: bool,
    },
    /// Wait for a group's nodes to be replaced and write the new list
    Refresh {
        /// Group from the input that is being replaced
        #[arg(long)]
        refresh_group: String,
    },
    /// Write one consensus node per region for backups
    Backup,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.settings.as_deref())?;
    let inventory = Ec2Inventory::new();
    let dir = Path::new(".");

    let out_file = match &cli.command {
        Command::Create { final_servers } => {
            workflow::create(&inventory, &settings, dir, &cli.ssh_user, *final_servers).await?
        }
        Command::Refresh { refresh_group } => {
            workflow::refresh(&inventory, &settings, dir, &cli.ssh_user, refresh_group).await?
        }
        Command::Backup => workflow::backup(&inventory, &settings, dir, &cli.ssh_user).await?,
    };

    info!("Wrote {}", out_file.display());
    Ok(())
}
