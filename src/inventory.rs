//! Read-only view of the cloud instance inventory.
//!
//! The replacement detector and the discovery workflows only ever need one
//! operation from the cloud provider: list the instances in a region that
//! match a set of filters. [`InventoryQuery`] is that seam; the EC2
//! implementation lives in [`crate::ec2`].

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;

pub const NAME_TAG: &str = "Name";
pub const REGION_TAG: &str = "Region";
pub const ROLE_TAG: &str = "Role";
pub const NETWORK_ID_TAG: &str = "NetworkId";
pub const RUNNING_STATE: &str = "running";

/// One instance as reported by the inventory.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceRecord {
    pub tags: BTreeMap<String, String>,
    /// Public DNS name of the instance, empty when it has none.
    pub public_address: String,
    pub instance_id: String,
    /// Lifecycle state name, for example `running`.
    pub state: String,
}

impl InstanceRecord {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// A single exact-match predicate.
///
/// Values inside one filter are alternatives; separate filters passed to
/// [`InventoryQuery::list_instances`] must all hold.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InstanceFilter {
    Tag { key: String, values: Vec<String> },
    State(String),
}

impl InstanceFilter {
    pub fn tag(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Tag {
            key: key.into(),
            values: vec![value.into()],
        }
    }

    pub fn tag_any<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Tag {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn network(network_id: &str) -> Self {
        Self::tag(NETWORK_ID_TAG, network_id)
    }

    pub fn running() -> Self {
        Self::State(RUNNING_STATE.to_string())
    }

    /// Evaluates the filter against an instance the way the provider would.
    #[cfg(test)]
    pub fn matches(&self, instance: &InstanceRecord) -> bool {
        match self {
            Self::Tag { key, values } => instance
                .tag(key)
                .is_some_and(|value| values.iter().any(|v| v == value)),
            Self::State(state) => &instance.state == state,
        }
    }
}

#[async_trait]
pub trait InventoryQuery {
    /// Lists the instances in `region` matching every filter.
    async fn list_instances(
        &self,
        region: &str,
        filters: &[InstanceFilter],
    ) -> Result<Vec<InstanceRecord>>;
}
