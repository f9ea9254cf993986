use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::{Filter, Instance};
use aws_sdk_ec2::Client as Ec2Client;
use aws_types::region::Region;
use aws_types::SdkConfig;
use log::debug;
use tokio::sync::Mutex;

use crate::error::{Result, SshToError};
use crate::inventory::{InstanceFilter, InstanceRecord, InventoryQuery};

/// Inventory backed by `DescribeInstances`, with one client per region.
#[derive(Default)]
pub struct Ec2Inventory {
    clients: Mutex<HashMap<String, Ec2Client>>,
}

impl Ec2Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    async fn client(&self, region: &str) -> Ec2Client {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(region) {
            return client.clone();
        }
        let config = regional_config(region).await;
        let client = Ec2Client::new(&config);
        clients.insert(region.to_string(), client.clone());
        client
    }
}

#[async_trait]
impl InventoryQuery for Ec2Inventory {
    async fn list_instances(
        &self,
        region: &str,
        filters: &[InstanceFilter],
    ) -> Result<Vec<InstanceRecord>> {
        let client = self.client(region).await;
        let filters: Vec<Filter> = filters.iter().map(to_ec2_filter).collect();

        let mut instances = Vec::new();
        let mut next_token = None;
        loop {
            let resp = client
                .describe_instances()
                .set_filters(Some(filters.clone()))
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|err| SshToError::Inventory {
                    region: region.to_string(),
                    message: DisplayErrorContext(&err).to_string(),
                })?;

            instances.extend(
                resp.reservations()
                    .iter()
                    .flat_map(|res| res.instances())
                    .map(to_record),
            );

            next_token = resp.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        debug!("{} instances matched in {}", instances.len(), region);
        Ok(instances)
    }
}

/// Loads credentials from the default chain, pinned to `region`.
async fn regional_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::v2024_03_28())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

fn to_ec2_filter(filter: &InstanceFilter) -> Filter {
    match filter {
        InstanceFilter::Tag { key, values } => Filter::builder()
            .name(format!("tag:{}", key))
            .set_values(Some(values.clone()))
            .build(),
        InstanceFilter::State(state) => Filter::builder()
            .name("instance-state-name")
            .values(state)
            .build(),
    }
}

fn to_record(instance: &Instance) -> InstanceRecord {
    InstanceRecord {
        tags: instance
            .tags()
            .iter()
            .filter_map(|tag| Some((tag.key()?.to_string(), tag.value()?.to_string())))
            .collect(),
        public_address: instance.public_dns_name().unwrap_or_default().to_string(),
        instance_id: instance.instance_id().unwrap_or_default().to_string(),
        state: instance
            .state()
            .and_then(|state| state.name())
            .map(|name| name.as_str().to_string())
            .unwrap_or_default(),
    }
}
