use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Data, Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::replacement::PollPolicy;

pub const SETTINGS_FILE: &str = "sshto.toml";
pub const ENV_PREFIX: &str = "SSHTO_";

/// Regions the network is deployed to.
pub const SUPPORTED_REGIONS: [&str; 14] = [
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-central-1",
    "eu-west-1",
    "eu-west-2",
    "ap-south-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ca-central-1",
    "sa-east-1",
];

/// Scope shared by every inventory query.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Settings {
    /// Value of the `NetworkId` tag identifying the network.
    #[serde(deserialize_with = "string_or_number")]
    pub network_id: String,
    /// Regions searched during discovery, in output order.
    pub regions: Vec<String>,
    pub poll_interval_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_poll_passes: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network_id: "1".into(),
            regions: SUPPORTED_REGIONS.iter().map(|r| r.to_string()).collect(),
            poll_interval_secs: 20,
            max_poll_passes: None,
        }
    }
}

impl Settings {
    /// Loads defaults, then the settings file, then `SSHTO_*` variables.
    ///
    /// An explicit `path` must exist; the default `sshto.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Toml::file_exact(path),
            None => Toml::file(SETTINGS_FILE),
        };
        Self::figment(file).extract().map_err(|e| Box::new(e).into())
    }

    fn figment(file: Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_passes: self.max_poll_passes,
        }
    }
}

/// Accepts `network_id = 2` as well as `network_id = "2"`; environment
/// values such as `SSHTO_NETWORK_ID=2` arrive as integers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => text,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SshToError;
    use figment::Jail;

    #[test]
    fn defaults_cover_supported_regions() {
        let settings = Settings::default();
        assert_eq!(settings.network_id, "1");
        assert_eq!(settings.regions.len(), SUPPORTED_REGIONS.len());
        assert_eq!(settings.poll_policy(), PollPolicy::default());
    }

    #[test]
    fn explicit_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                "network_id = \"gamma\"\nregions = [\"us-east-1\"]\nmax_poll_passes = 3\n",
            )?;

            let settings =
                Settings::load(Some(Path::new("custom.toml"))).expect("settings should load");
            assert_eq!(settings.network_id, "gamma");
            assert_eq!(settings.regions, vec!["us-east-1".to_string()]);
            assert_eq!(settings.poll_interval_secs, 20);
            assert_eq!(settings.poll_policy().max_passes, Some(3));
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let err = Settings::load(Some(Path::new("typo.toml")))
                .expect_err("a missing settings file must not fall back to defaults");
            assert!(
                matches!(err, SshToError::Settings(_)),
                "unexpected error: {err:?}"
            );
            Ok(())
        });
    }

    #[test]
    fn default_file_is_optional() {
        Jail::expect_with(|_jail| {
            let settings = Settings::load(None).expect("defaults should load");
            assert_eq!(settings, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn default_file_is_read_from_working_directory() {
        Jail::expect_with(|jail| {
            jail.create_file(SETTINGS_FILE, "network_id = 7\npoll_interval_secs = 5\n")?;

            let settings = Settings::load(None).expect("settings should load");
            assert_eq!(settings.network_id, "7");
            assert_eq!(settings.poll_interval_secs, 5);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(SETTINGS_FILE, "network_id = \"1\"\nmax_poll_passes = 3\n")?;
            jail.set_env("SSHTO_NETWORK_ID", "2");
            jail.set_env("SSHTO_MAX_POLL_PASSES", "10");

            let settings = Settings::load(None).expect("settings should load");
            assert_eq!(settings.network_id, "2");
            assert_eq!(settings.max_poll_passes, Some(10));
            Ok(())
        });
    }

    #[test]
    fn textual_network_id_from_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("SSHTO_NETWORK_ID", "gamma");

            let settings = Settings::load(None).expect("settings should load");
            assert_eq!(settings.network_id, "gamma");
            Ok(())
        });
    }
}
