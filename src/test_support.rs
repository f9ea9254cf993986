//! In-memory inventories used by unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, SshToError};
use crate::inventory::{
    InstanceFilter, InstanceRecord, InventoryQuery, NAME_TAG, NETWORK_ID_TAG, REGION_TAG,
    ROLE_TAG, RUNNING_STATE,
};

/// Builds a running instance tagged for network `1`.
pub fn instance(
    instance_id: &str,
    public_address: &str,
    name: &str,
    region: &str,
    role: &str,
) -> InstanceRecord {
    let tags = BTreeMap::from([
        (NAME_TAG.to_string(), name.to_string()),
        (REGION_TAG.to_string(), region.to_string()),
        (ROLE_TAG.to_string(), role.to_string()),
        (NETWORK_ID_TAG.to_string(), "1".to_string()),
    ]);
    InstanceRecord {
        tags,
        public_address: public_address.to_string(),
        instance_id: instance_id.to_string(),
        state: RUNNING_STATE.to_string(),
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InventoryCall {
    pub region: String,
    pub filters: Vec<InstanceFilter>,
}

/// Replays queued responses in order and records every query.
#[derive(Clone, Debug, Default)]
pub struct ScriptedInventory {
    responses: Arc<Mutex<VecDeque<Vec<InstanceRecord>>>>,
    calls: Arc<Mutex<Vec<InventoryCall>>>,
}

impl ScriptedInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Vec<InstanceRecord>) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<InventoryCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn pending(&self) -> usize {
        self.responses.lock().expect("responses lock").len()
    }
}

#[async_trait]
impl InventoryQuery for ScriptedInventory {
    async fn list_instances(
        &self,
        region: &str,
        filters: &[InstanceFilter],
    ) -> Result<Vec<InstanceRecord>> {
        self.calls.lock().expect("calls lock").push(InventoryCall {
            region: region.to_string(),
            filters: filters.to_vec(),
        });
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .ok_or_else(|| SshToError::Inventory {
                region: region.to_string(),
                message: "no scripted response left".to_string(),
            })
    }
}

/// A fixed fleet per region, filtered the way EC2 would filter it.
#[derive(Clone, Debug, Default)]
pub struct FleetInventory {
    regions: HashMap<String, Vec<InstanceRecord>>,
}

impl FleetInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, region: &str, instance: InstanceRecord) -> Self {
        self.regions
            .entry(region.to_string())
            .or_default()
            .push(instance);
        self
    }
}

#[async_trait]
impl InventoryQuery for FleetInventory {
    async fn list_instances(
        &self,
        region: &str,
        filters: &[InstanceFilter],
    ) -> Result<Vec<InstanceRecord>> {
        Ok(self
            .regions
            .get(region)
            .into_iter()
            .flatten()
            .filter(|instance| filters.iter().all(|filter| filter.matches(instance)))
            .cloned()
            .collect())
    }
}
