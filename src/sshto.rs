//! Reading and writing ssh-to server lists.
//!
//! The files are a JSON object mapping group names to arrays of
//! `[ssh_target, display_name, comment]` triples. The layout is consumed
//! verbatim by ssh-to, so groups keep their insertion order and the output
//! is pretty-printed with two-space indentation and no trailing newline.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SshToError};
use crate::node::NodeRecord;

/// One ssh-to entry; serialized as a three-element JSON array.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SshEntry(pub String, pub String, pub String);

impl SshEntry {
    pub fn new(target: String, name: String, comment: String) -> Self {
        Self(target, name, comment)
    }

    pub fn fields(&self) -> Vec<String> {
        vec![self.0.clone(), self.1.clone(), self.2.clone()]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SshToConfig {
    groups: Map<String, Value>,
}

impl SshToConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| SshToError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let groups = serde_json::from_str(&raw).map_err(|source| SshToError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { groups })
    }

    /// Appends a group, replacing any group already stored under `name`.
    pub fn insert_group(&mut self, name: &str, entries: &[SshEntry]) {
        let entries = entries
            .iter()
            .map(|entry| Value::from(entry.fields()))
            .collect::<Vec<_>>();
        self.groups.insert(name.to_string(), Value::Array(entries));
    }

    #[cfg(test)]
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Parses every entry of `group` into a node record.
    ///
    /// Returns `Ok(None)` when the group does not exist.
    pub fn group_nodes(&self, group: &str) -> Result<Option<Vec<NodeRecord>>> {
        let Some(value) = self.groups.get(group) else {
            return Ok(None);
        };
        let Value::Array(entries) = value else {
            return Err(SshToError::MalformedRecord {
                entry: value.to_string(),
                reason: format!("group {group} is not a list of entries"),
            });
        };

        entries
            .iter()
            .map(|entry| NodeRecord::from_entry(&string_fields(entry)?))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.groups)
    }

    fn render(&self, path: &Path) -> Result<String> {
        self.to_json().map_err(|source| SshToError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the config to a file that must not exist yet.
    pub fn write_new(&self, path: &Path) -> Result<()> {
        let contents = self.render(path)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| match source.kind() {
                ErrorKind::AlreadyExists => SshToError::OutputExists {
                    path: path.to_path_buf(),
                },
                _ => SshToError::Io {
                    path: path.to_path_buf(),
                    source,
                },
            })?;
        file.write_all(contents.as_bytes())
            .map_err(|source| SshToError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Writes the config, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let contents = self.render(path)?;
        fs::write(path, contents).map_err(|source| SshToError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fails with [`SshToError::OutputExists`] when `path` is already present.
pub fn ensure_absent(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(SshToError::OutputExists {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn string_fields(entry: &Value) -> Result<Vec<String>> {
    let malformed = |reason: &str| SshToError::MalformedRecord {
        entry: entry.to_string(),
        reason: reason.to_string(),
    };
    entry
        .as_array()
        .ok_or_else(|| malformed("entry is not a list"))?
        .iter()
        .map(|field| {
            field
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| malformed("entry fields must be strings"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(target: &str, name: &str, comment: &str) -> SshEntry {
        SshEntry::new(target.to_string(), name.to_string(), comment.to_string())
    }

    #[test]
    fn renders_ssh_to_layout() {
        let mut config = SshToConfig::new();
        config.insert_group("maker-b", &[]);
        config.insert_group(
            "maker-a",
            &[entry("ubuntu@a.example.com", "maker-1", "us-east-1:i-1")],
        );

        let expected = "{\n  \"maker-b\": [],\n  \"maker-a\": [\n    [\n      \"ubuntu@a.example.com\",\n      \"maker-1\",\n      \"us-east-1:i-1\"\n    ]\n  ]\n}";
        assert_eq!(config.to_json().expect("json"), expected);
    }

    #[test]
    fn loads_group_nodes() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("initial-servers.json");
        fs::write(
            &path,
            r#"{"maker-a": [["ubuntu@old.example.com", "maker-1", "us-east-1:i-OLD123"]]}"#,
        )
        .expect("write input");

        let config = SshToConfig::load(&path).expect("config should load");
        let nodes = config
            .group_nodes("maker-a")
            .expect("entries should parse")
            .expect("group should exist");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].hostname, "old.example.com");
        assert_eq!(nodes[0].instance_id, "i-OLD123");
        assert!(config.group_nodes("maker-b").expect("lookup").is_none());
    }

    #[test]
    fn non_string_fields_are_malformed() {
        let config = SshToConfig {
            groups: serde_json::from_str(r#"{"g": [["ubuntu@a", 3, "r:i"]]}"#).expect("json"),
        };
        let err = config.group_nodes("g").expect_err("entry should be rejected");
        assert!(matches!(err, SshToError::MalformedRecord { .. }));
    }

    #[test]
    fn written_files_hold_the_rendered_config() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = SshToConfig::new();
        config.insert_group(
            "backup",
            &[entry("ubuntu@a.example.com", "maker-1", "us-east-1")],
        );
        let rendered = config.to_json().expect("json");

        let fresh = dir.path().join("initial-servers.json");
        config.write_new(&fresh).expect("write new file");
        assert_eq!(fs::read_to_string(&fresh).expect("read back"), rendered);

        let replaced = dir.path().join("backup-servers.json");
        fs::write(&replaced, "stale").expect("seed file");
        config.write(&replaced).expect("overwrite file");
        assert_eq!(fs::read_to_string(&replaced).expect("read back"), rendered);
    }

    #[test]
    fn write_new_refuses_existing_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("temp-servers.json");
        fs::write(&path, "{}").expect("seed file");

        let err = SshToConfig::new()
            .write_new(&path)
            .expect_err("existing file must not be overwritten");
        assert!(matches!(err, SshToError::OutputExists { .. }));
        assert_eq!(fs::read_to_string(&path).expect("read back"), "{}");
        assert!(matches!(
            ensure_absent(&path),
            Err(SshToError::OutputExists { .. })
        ));
    }
}
