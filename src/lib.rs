//! Builds ssh-to server lists from tagged EC2 instances and follows nodes
//! through a blue/green refresh.

pub mod discovery;
pub mod ec2;
pub mod error;
pub mod inventory;
pub mod node;
pub mod replacement;
pub mod settings;
pub mod ssh;
pub mod sshto;
#[cfg(test)]
pub mod test_support;
pub mod workflow;

pub use ec2::Ec2Inventory;
pub use error::{Result, SshToError};
pub use inventory::{InstanceFilter, InstanceRecord, InventoryQuery};
pub use node::NodeRecord;
pub use replacement::{PollPolicy, ReplacementDetector, ReplacementPoller};
pub use settings::Settings;
pub use sshto::{SshEntry, SshToConfig};
