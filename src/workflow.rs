//! The three CLI workflows, each producing one ssh-to file in `dir`.

use std::path::{Path, PathBuf};

use log::info;

use crate::discovery::Discovery;
use crate::error::{Result, SshToError};
use crate::inventory::InventoryQuery;
use crate::replacement::{ReplacementDetector, ReplacementPoller};
use crate::settings::Settings;
use crate::sshto::{ensure_absent, SshToConfig};

pub const INITIAL_SERVERS_FILE: &str = "initial-servers.json";
pub const FINAL_SERVERS_FILE: &str = "final-servers.json";
pub const REFRESHED_SERVERS_FILE: &str = "temp-servers.json";
pub const BACKUP_SERVERS_FILE: &str = "backup-servers.json";

/// Writes the role-grouped server list, refusing to overwrite it.
pub async fn create<Q: InventoryQuery + ?Sized>(
    inventory: &Q,
    settings: &Settings,
    dir: &Path,
    ssh_user: &str,
    final_servers: bool,
) -> Result<PathBuf> {
    let out_file = dir.join(if final_servers {
        FINAL_SERVERS_FILE
    } else {
        INITIAL_SERVERS_FILE
    });
    ensure_absent(&out_file)?;

    let config = Discovery::new(inventory, settings)
        .server_groups(ssh_user, final_servers)
        .await?;

    info!("Dumping server config to {}", out_file.display());
    config.write_new(&out_file)?;
    Ok(out_file)
}

/// Waits for every node of `group` in the initial server list to be
/// replaced, then writes the replacements under the same group name.
pub async fn refresh<Q: InventoryQuery + ?Sized>(
    inventory: &Q,
    settings: &Settings,
    dir: &Path,
    ssh_user: &str,
    group: &str,
) -> Result<PathBuf> {
    let out_file = dir.join(REFRESHED_SERVERS_FILE);
    ensure_absent(&out_file)?;

    let in_file = dir.join(INITIAL_SERVERS_FILE);
    let originals = SshToConfig::load(&in_file)?
        .group_nodes(group)?
        .ok_or_else(|| SshToError::UnknownGroup {
            group: group.to_string(),
            path: in_file.clone(),
        })?;
    info!("Waiting for {} nodes of group {} to be replaced", originals.len(), group);

    let detector = ReplacementDetector::new(inventory, settings.network_id.as_str());
    let replacements = ReplacementPoller::new(detector, settings.poll_policy())
        .wait_for_replacements(&originals)
        .await?;

    let entries: Vec<_> = replacements
        .iter()
        .map(|node| node.to_entry(ssh_user))
        .collect();
    let mut config = SshToConfig::new();
    config.insert_group(group, &entries);

    info!(
        "Dumping server config with replacement instances for group {} to {}",
        group,
        out_file.display()
    );
    config.write_new(&out_file)?;
    Ok(out_file)
}

/// Writes the backup server list, replacing any previous one.
pub async fn backup<Q: InventoryQuery + ?Sized>(
    inventory: &Q,
    settings: &Settings,
    dir: &Path,
    ssh_user: &str,
) -> Result<PathBuf> {
    let out_file = dir.join(BACKUP_SERVERS_FILE);
    let config = Discovery::new(inventory, settings)
        .backup_group(ssh_user)
        .await?;

    info!("Dumping backup server config to {}", out_file.display());
    config.write(&out_file)?;
    Ok(out_file)
}
