//! Comparable identity of one logical node.

use crate::error::{Result, SshToError};
use crate::inventory::{InstanceRecord, NAME_TAG, REGION_TAG};
use crate::ssh::{ssh_target, target_hostname};
use crate::sshto::SshEntry;

/// One logical node as seen at a point in time.
///
/// `name` is the stable key across a replacement; `instance_id` and
/// `hostname` change when the node is replaced.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct NodeRecord {
    pub hostname: String,
    pub name: String,
    pub region: String,
    pub instance_id: String,
}

impl NodeRecord {
    /// Parses a persisted `[ssh_target, name, "region:instance_id"]` entry.
    pub fn from_entry(entry: &[String]) -> Result<Self> {
        let [target, name, comment] = entry else {
            return Err(malformed(
                entry,
                format!("expected 3 fields, found {}", entry.len()),
            ));
        };
        let parts: Vec<&str> = comment.split(':').collect();
        let [region, instance_id] = parts.as_slice() else {
            return Err(malformed(
                entry,
                format!("comment {comment:?} is not region:instance_id"),
            ));
        };

        Ok(Self {
            hostname: target_hostname(target).to_string(),
            name: name.clone(),
            region: (*region).to_string(),
            instance_id: (*instance_id).to_string(),
        })
    }

    /// Builds a record from a live instance using its `Name` and `Region` tags.
    pub fn from_instance(instance: &InstanceRecord) -> Result<Self> {
        Ok(Self {
            hostname: instance.public_address.clone(),
            name: required_tag(instance, NAME_TAG)?.to_string(),
            region: required_tag(instance, REGION_TAG)?.to_string(),
            instance_id: instance.instance_id.clone(),
        })
    }

    /// Builds a record for an instance discovered by querying `region`.
    ///
    /// Only the `Name` tag is required; the region is the one queried.
    pub fn discovered(region: &str, instance: &InstanceRecord) -> Result<Self> {
        Ok(Self {
            hostname: instance.public_address.clone(),
            name: required_tag(instance, NAME_TAG)?.to_string(),
            region: region.to_string(),
            instance_id: instance.instance_id.clone(),
        })
    }

    pub fn to_entry(&self, ssh_user: &str) -> SshEntry {
        SshEntry::new(
            ssh_target(ssh_user, &self.hostname),
            self.name.clone(),
            format!("{}:{}", self.region, self.instance_id),
        )
    }
}

pub(crate) fn required_tag<'a>(instance: &'a InstanceRecord, tag: &str) -> Result<&'a str> {
    instance.tag(tag).ok_or_else(|| SshToError::MissingTag {
        instance_id: instance.instance_id.clone(),
        tag: tag.to_string(),
    })
}

fn malformed(entry: &[String], reason: String) -> SshToError {
    SshToError::MalformedRecord {
        entry: format!("{entry:?}"),
        reason,
    }
}
