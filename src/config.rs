use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{BasicAuth, Credentials};
use crate::error::MigratorError;

pub const DEFAULT_CONFIG_PATH: &str = "./migrator-conf.json";
pub const DEFAULT_AUTH_PATH: &str = "./migrator-auth.json";
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Connection settings file (`migrator-conf.json`).
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigFile {
    #[serde(rename = "SourceURL", default)]
    pub source_url: String,
    #[serde(rename = "TargetURL", default)]
    pub target_url: String,
    #[serde(rename = "SourceDownloadURL", default)]
    pub source_download_url: String,
    #[serde(default)]
    pub workers: usize,
    #[serde(default)]
    pub fetch_workers: Option<usize>,
    #[serde(default)]
    pub decode_workers: Option<usize>,
    #[serde(default)]
    pub plan_workers: Option<usize>,
    #[serde(default)]
    pub transfer_workers: Option<usize>,
    #[serde(default)]
    pub queue_capacity: Option<usize>,
}

/// Credentials file (`migrator-auth.json`).
#[derive(Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AuthFile {
    pub source_user: String,
    pub source_password: String,
    pub target_user: String,
    pub target_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub listing_base: String,
    pub download_base: String,
    pub upload_base: String,
}

impl Endpoints {
    pub fn listing_url(&self, path: &str) -> String {
        format!("{}{}", self.listing_base, path)
    }

    pub fn download_url(&self, path: &str) -> String {
        format!("{}{}", self.download_base, path)
    }

    pub fn upload_url(&self, path: &str) -> String {
        format!("{}{}", self.upload_base, path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSizes {
    pub fetch: usize,
    pub decode: usize,
    pub plan: usize,
    pub transfer: usize,
}

impl PoolSizes {
    pub fn uniform(workers: usize) -> Self {
        Self {
            fetch: workers,
            decode: workers,
            plan: workers,
            transfer: workers,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MigratorConfig {
    pub endpoints: Endpoints,
    pub credentials: Credentials,
    pub pools: PoolSizes,
    pub queue_capacity: usize,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(config_path: &Path, auth_path: &Path) -> Result<MigratorConfig, MigratorError> {
        let config: ConfigFile = read_json(config_path)?;
        let auth: AuthFile = read_json(auth_path)?;
        Self::resolve_files(config, auth)
    }

    pub fn resolve_files(
        config: ConfigFile,
        auth: AuthFile,
    ) -> Result<MigratorConfig, MigratorError> {
        for (key, value) in [
            ("SourceURL", &config.source_url),
            ("SourceDownloadURL", &config.source_download_url),
            ("TargetURL", &config.target_url),
        ] {
            if value.trim().is_empty() {
                return Err(MigratorError::InvalidConfig(format!("{key} is required")));
            }
        }

        let workers = config.workers;
        let pools = PoolSizes {
            fetch: config.fetch_workers.unwrap_or(workers),
            decode: config.decode_workers.unwrap_or(workers),
            plan: config.plan_workers.unwrap_or(workers),
            transfer: config.transfer_workers.unwrap_or(workers),
        };
        for (key, size) in [
            ("FetchWorkers", pools.fetch),
            ("DecodeWorkers", pools.decode),
            ("PlanWorkers", pools.plan),
            ("TransferWorkers", pools.transfer),
        ] {
            if size == 0 {
                return Err(MigratorError::InvalidConfig(format!(
                    "{key} must be at least 1 (set Workers or {key})"
                )));
            }
        }

        let queue_capacity = config.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY);
        if queue_capacity == 0 {
            return Err(MigratorError::InvalidConfig(
                "QueueCapacity must be at least 1".to_string(),
            ));
        }

        Ok(MigratorConfig {
            endpoints: Endpoints {
                listing_base: config.source_url,
                download_base: config.source_download_url,
                upload_base: config.target_url,
            },
            credentials: Credentials {
                source: BasicAuth {
                    user: auth.source_user,
                    password: auth.source_password,
                },
                target: BasicAuth {
                    user: auth.target_user,
                    password: auth.target_password,
                },
            },
            pools,
            queue_capacity,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, MigratorError> {
    let content =
        fs::read_to_string(path).map_err(|_| MigratorError::ConfigRead(PathBuf::from(path)))?;
    serde_json::from_str(&content).map_err(|err| MigratorError::ConfigParse {
        path: PathBuf::from(path),
        message: err.to_string(),
    })
}
