//! Tracking node replacement during a rolling refresh.
//!
//! While the refresh runs, a node's name is served by one of three
//! inventory states:
//!
//! 1. the old instance is still up and the new one is not yet running,
//! 2. the old instance is gone and the new one is not yet running,
//! 3. the new instance is running (the old one may still be listed).
//!
//! The detector reports a replacement only in case 3. The poller keeps
//! asking until every node has reached it.

use std::time::Duration;

use log::info;
use tokio::time::sleep;

use crate::error::{Result, SshToError};
use crate::inventory::{InstanceFilter, InventoryQuery, NAME_TAG};
use crate::node::NodeRecord;

/// Finds the instance that replaced a known node.
pub struct ReplacementDetector<'a, Q: ?Sized> {
    inventory: &'a Q,
    network_id: String,
}

impl<'a, Q: InventoryQuery + ?Sized> ReplacementDetector<'a, Q> {
    pub fn new(inventory: &'a Q, network_id: impl Into<String>) -> Self {
        Self {
            inventory,
            network_id: network_id.into(),
        }
    }

    /// Returns the running instance now carrying `original.name`, or `None`
    /// while the original is still the only one (or nothing is running).
    ///
    /// A candidate with a new instance id but the original's hostname is
    /// reported as [`SshToError::ReplacementInvariant`].
    pub async fn check(&self, original: &NodeRecord) -> Result<Option<NodeRecord>> {
        let filters = [
            InstanceFilter::network(&self.network_id),
            InstanceFilter::running(),
            InstanceFilter::tag(NAME_TAG, original.name.as_str()),
        ];
        let candidates = self
            .inventory
            .list_instances(&original.region, &filters)
            .await?;

        for instance in &candidates {
            let candidate = NodeRecord::from_instance(instance)?;
            if candidate.instance_id == original.instance_id {
                info!(
                    "Old instance {} for {} not yet replaced",
                    original.instance_id, original.name
                );
                continue;
            }
            if candidate.hostname == original.hostname {
                return Err(SshToError::ReplacementInvariant {
                    name: original.name.clone(),
                    old_instance_id: original.instance_id.clone(),
                    new_instance_id: candidate.instance_id,
                    hostname: candidate.hostname,
                });
            }
            return Ok(Some(candidate));
        }
        Ok(None)
    }
}

/// How often to poll and when to give up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Stop after this many passes; `None` polls until every node is replaced.
    pub max_passes: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(20),
            max_passes: None,
        }
    }
}

pub struct ReplacementPoller<'a, Q: ?Sized> {
    detector: ReplacementDetector<'a, Q>,
    policy: PollPolicy,
}

impl<'a, Q: InventoryQuery + ?Sized> ReplacementPoller<'a, Q> {
    pub fn new(detector: ReplacementDetector<'a, Q>, policy: PollPolicy) -> Self {
        Self { detector, policy }
    }

    /// Polls until every node in `originals` has a replacement.
    ///
    /// Replacements are returned in the order of `originals`. Any detector
    /// error aborts polling.
    pub async fn wait_for_replacements(&self, originals: &[NodeRecord]) -> Result<Vec<NodeRecord>> {
        let mut replacements: Vec<Option<NodeRecord>> = vec![None; originals.len()];
        let mut passes = 0u32;

        loop {
            passes += 1;
            for (original, slot) in originals.iter().zip(replacements.iter_mut()) {
                if slot.is_none() {
                    *slot = self.detector.check(original).await?;
                }
            }

            let remaining = replacements.iter().filter(|slot| slot.is_none()).count();
            if remaining == 0 {
                info!(
                    "All {} nodes replaced after {} polling passes",
                    originals.len(),
                    passes
                );
                break;
            }
            info!("Still waiting for {} unreplaced nodes", remaining);
            if let Some(max_passes) = self.policy.max_passes {
                if passes >= max_passes {
                    return Err(SshToError::PollLimitReached { passes, remaining });
                }
            }

            info!(
                "Sleeping for {} seconds before polling again",
                self.policy.interval.as_secs()
            );
            sleep(self.policy.interval).await;
        }

        Ok(replacements.into_iter().flatten().collect())
    }
}
