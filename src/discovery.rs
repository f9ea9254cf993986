//! One-shot discovery of the network's nodes into ssh-to groups.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::inventory::{InstanceFilter, InstanceRecord, InventoryQuery, NAME_TAG, ROLE_TAG};
use crate::node::{required_tag, NodeRecord};
use crate::settings::Settings;
use crate::ssh::ssh_target;
use crate::sshto::{SshEntry, SshToConfig};

/// Functional class of a node, taken from its `Role` tag.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Role {
    Vault,
    Consul,
    Maker,
    Validator,
    Observer,
    Bootnode,
}

impl Role {
    /// Output order of the role groups.
    pub const ALL: [Role; 6] = [
        Role::Vault,
        Role::Consul,
        Role::Maker,
        Role::Validator,
        Role::Observer,
        Role::Bootnode,
    ];

    /// Roles that take part in consensus.
    pub const QUORUM: [Role; 3] = [Role::Maker, Role::Validator, Role::Observer];

    pub fn tag_value(self) -> &'static str {
        match self {
            Role::Vault => "Vault",
            Role::Consul => "Consul",
            Role::Maker => "Maker",
            Role::Validator => "Validator",
            Role::Observer => "Observer",
            Role::Bootnode => "Bootnode",
        }
    }

    pub fn group_prefix(self) -> &'static str {
        match self {
            Role::Vault => "vault",
            Role::Consul => "consul",
            Role::Maker => "maker",
            Role::Validator => "validator",
            Role::Observer => "observer",
            Role::Bootnode => "bootnode",
        }
    }

    pub fn from_tag(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.tag_value() == value)
    }
}

/// Splits `items` alternately into two buckets, keeping the first bucket at
/// least as large as the second.
pub fn partition_alternating<T>(items: impl IntoIterator<Item = T>) -> (Vec<T>, Vec<T>) {
    let mut a = Vec::new();
    let mut b = Vec::new();
    for item in items {
        if a.len() > b.len() {
            b.push(item);
        } else {
            a.push(item);
        }
    }
    (a, b)
}

pub struct Discovery<'a, Q: ?Sized> {
    inventory: &'a Q,
    settings: &'a Settings,
}

impl<'a, Q: InventoryQuery + ?Sized> Discovery<'a, Q> {
    pub fn new(inventory: &'a Q, settings: &'a Settings) -> Self {
        Self {
            inventory,
            settings,
        }
    }

    /// Builds the `<role>-a` / `<role>-b` server lists.
    ///
    /// With `include_aggregates` the `all-quorum` and `all-servers` groups
    /// are appended as well.
    pub async fn server_groups(&self, ssh_user: &str, include_aggregates: bool) -> Result<SshToConfig> {
        let filters = [
            InstanceFilter::network(&self.settings.network_id),
            InstanceFilter::running(),
        ];

        let mut by_role: BTreeMap<Role, Vec<SshEntry>> = BTreeMap::new();
        for region in &self.settings.regions {
            for instance in self.query_sorted(region, &filters).await? {
                let Some(role) = instance.tag(ROLE_TAG).and_then(Role::from_tag) else {
                    continue;
                };
                let node = NodeRecord::discovered(region, &instance)?;
                by_role.entry(role).or_default().push(node.to_entry(ssh_user));
            }
        }

        let mut config = SshToConfig::new();
        let mut halves: BTreeMap<Role, (Vec<SshEntry>, Vec<SshEntry>)> = BTreeMap::new();
        for role in Role::ALL {
            let (a, b) = partition_alternating(by_role.remove(&role).unwrap_or_default());
            config.insert_group(&format!("{}-a", role.group_prefix()), &a);
            config.insert_group(&format!("{}-b", role.group_prefix()), &b);
            halves.insert(role, (a, b));
        }

        if include_aggregates {
            let collect = |roles: &[Role]| -> Vec<SshEntry> {
                roles
                    .iter()
                    .filter_map(|role| halves.get(role))
                    .flat_map(|(a, b)| a.iter().chain(b.iter()).cloned())
                    .collect()
            };
            let quorum = collect(&Role::QUORUM);
            let mut servers = collect(&[Role::Vault, Role::Consul, Role::Bootnode]);
            servers.extend(quorum.iter().cloned());
            config.insert_group("all-quorum", &quorum);
            config.insert_group("all-servers", &servers);
        }

        Ok(config)
    }

    /// Picks one consensus node per region for backups.
    ///
    /// Entries carry only the region as their comment.
    pub async fn backup_group(&self, ssh_user: &str) -> Result<SshToConfig> {
        let filters = [
            InstanceFilter::network(&self.settings.network_id),
            InstanceFilter::tag_any(ROLE_TAG, Role::QUORUM.map(Role::tag_value)),
        ];

        let mut entries = Vec::new();
        for region in &self.settings.regions {
            let Some(instance) = self.query_sorted(region, &filters).await?.into_iter().next()
            else {
                continue;
            };
            let name = required_tag(&instance, NAME_TAG)?;
            entries.push(SshEntry::new(
                ssh_target(ssh_user, &instance.public_address),
                name.to_string(),
                region.clone(),
            ));
        }

        let mut config = SshToConfig::new();
        config.insert_group("backup", &entries);
        Ok(config)
    }

    /// Queries `region` with instances ordered by instance id.
    async fn query_sorted(
        &self,
        region: &str,
        filters: &[InstanceFilter],
    ) -> Result<Vec<InstanceRecord>> {
        let mut instances = self.inventory.list_instances(region, filters).await?;
        instances.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        Ok(instances)
    }
}
