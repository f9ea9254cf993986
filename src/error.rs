use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while discovering nodes or tracking their replacement.
///
/// None of these are transient: the only retry in the crate is the
/// replacement poll loop, which retries absence of a replacement and never
/// an error.
#[derive(Debug, Error)]
pub enum SshToError {
    /// A persisted ssh-to entry does not have the expected shape.
    #[error("malformed server entry {entry}: {reason}")]
    MalformedRecord {
        /// Entry as read from the config file.
        entry: String,
        /// What was wrong with it.
        reason: String,
    },
    /// A live instance lacks a tag the node record needs.
    #[error("instance {instance_id} has no {tag} tag")]
    MissingTag {
        /// Instance that was missing the tag.
        instance_id: String,
        /// Tag key that was expected.
        tag: String,
    },
    /// A different instance was found at the same address as the original.
    #[error(
        "replacement {new_instance_id} for {name} reuses hostname {hostname} of {old_instance_id}"
    )]
    ReplacementInvariant {
        /// Logical node name.
        name: String,
        /// Instance id recorded before the refresh.
        old_instance_id: String,
        /// Instance id of the candidate replacement.
        new_instance_id: String,
        /// Hostname shared by both instances.
        hostname: String,
    },
    /// Output file already exists and must not be overwritten.
    #[error("output file {} already exists, aborting to prevent accidental overwrite", path.display())]
    OutputExists {
        /// Path of the existing output file.
        path: PathBuf,
    },
    /// The requested refresh group is not present in the input file.
    #[error("group {group} not found in {}", path.display())]
    UnknownGroup {
        /// Group that was requested.
        group: String,
        /// Input file that was searched.
        path: PathBuf,
    },
    /// Polling stopped after the configured number of passes.
    #[error("{remaining} nodes still unreplaced after {passes} polling passes")]
    PollLimitReached {
        /// Passes completed.
        passes: u32,
        /// Nodes without a replacement when polling stopped.
        remaining: usize,
    },
    /// The cloud inventory API returned an error.
    #[error("instance query in {region} failed: {message}")]
    Inventory {
        /// Region that was queried.
        region: String,
        /// Error reported by the provider.
        message: String,
    },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Settings could not be loaded.
    #[error("failed to load settings: {0}")]
    Settings(#[from] Box<figment::Error>),
}

pub type Result<T, E = SshToError> = std::result::Result<T, E>;
