use std::{env, net::SocketAddr, path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use blob_store::{BlobStorageConfig, StorageKind};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Flat environment variables accepted for compatibility with existing
/// deployments, mapped onto their nested keys.
const LEGACY_ENV_KEYS: [(&str, &str); 8] = [
    ("storage_backend", "blob_storage.backend"),
    ("local_storage_path", "blob_storage.local_path"),
    ("s3_endpoint", "blob_storage.s3.endpoint"),
    ("s3_bucket", "blob_storage.s3.bucket"),
    ("s3_access_key", "blob_storage.s3.access_key"),
    ("s3_secret_key", "blob_storage.s3.secret_key"),
    ("s3_region", "blob_storage.s3.region"),
    ("database_url", "database_url"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_url: String,
    /// Bearer token required on the blob API; unset disables the check.
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub structured_logging: bool,
    #[serde(default)]
    pub blob_storage: BlobStorageConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enable_metrics: bool,
    // OpenTelemetry collector grpc endpoint for metrics. Falls back to
    // OTEL_EXPORTER_OTLP_ENDPOINT, then localhost:4317.
    pub endpoint: Option<String>,
    pub metrics_interval_secs: u64,
}

impl TelemetryConfig {
    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            endpoint: None,
            metrics_interval_secs: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let database_path = env::current_dir()
            .unwrap_or_default()
            .join("blobgate_storage/blobgate.db");
        ServerConfig {
            listen_addr: "0.0.0.0:8900".to_string(),
            database_url: format!("sqlite://{}", database_path.display()),
            api_token: None,
            structured_logging: false,
            blob_storage: Default::default(),
            telemetry: Default::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults, then the YAML file at `path` if given, then the flat legacy
    /// variables, then `BLOBGATE_`-prefixed variables with `__` separating
    /// nested keys (`BLOBGATE_BLOB_STORAGE__BACKEND=s3`).
    pub fn load(path: Option<&Path>) -> Result<ServerConfig> {
        let mut figment = Figment::from(Serialized::defaults(ServerConfig::default()));
        if let Some(path) = path {
            let config_str = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            figment = figment.merge(Yaml::string(&config_str));
        }
        let config: ServerConfig = figment
            .merge(legacy_env())
            .merge(Env::prefixed("BLOBGATE_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(anyhow!("invalid listen address: {}", self.listen_addr));
        }
        if self.database_url.trim().is_empty() {
            return Err(anyhow!("database_url must not be empty"));
        }
        if self.telemetry.enable_metrics && self.telemetry.metrics_interval_secs == 0 {
            return Err(anyhow!("telemetry.metrics_interval_secs must be positive"));
        }
        if self.blob_storage.kind() == StorageKind::S3 {
            let s3 = &self.blob_storage.s3;
            let endpoint = s3
                .endpoint()
                .ok_or_else(|| anyhow!("s3 blob storage requires an endpoint"))?;
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(anyhow!(
                    "s3 endpoint must be an http or https url: {}",
                    endpoint
                ));
            }
            if s3.bucket().is_none() {
                return Err(anyhow!("s3 blob storage requires a bucket"));
            }
        }
        Ok(())
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

fn legacy_env() -> Env {
    let names: Vec<&str> = LEGACY_ENV_KEYS.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        LEGACY_ENV_KEYS
            .iter()
            .find(|(name, _)| key == *name)
            .map(|(_, nested)| (*nested).into())
            .unwrap_or_else(|| key.as_str().into())
    })
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = ServerConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.listen_addr, "0.0.0.0:8900");
            assert!(config.database_url.starts_with("sqlite://"));
            assert!(config.database_url.ends_with("blobgate_storage/blobgate.db"));
            assert_eq!(config.blob_storage.kind(), StorageKind::Local);
            assert_eq!(config.api_token(), None);
            assert!(!config.structured_logging);
            assert!(!config.telemetry.enable_metrics);
            assert_eq!(config.telemetry.metrics_interval(), Duration::from_secs(10));
            Ok(())
        });
    }

    #[test]
    fn test_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "blobgate.yaml",
                r#"
listen_addr: 127.0.0.1:9000
database_url: "sqlite::memory:"
api_token: token
blob_storage:
  backend: s3
  s3:
    endpoint: http://localhost:9000
    bucket: blobs
    virtual_host: true
telemetry:
  enable_metrics: true
  endpoint: http://collector:4317
"#,
            )?;
            let config =
                ServerConfig::load(Some(Path::new("blobgate.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.listen_addr, "127.0.0.1:9000");
            assert_eq!(config.database_url, "sqlite::memory:");
            assert_eq!(config.api_token(), Some("token"));
            assert_eq!(config.blob_storage.kind(), StorageKind::S3);
            assert_eq!(config.blob_storage.s3.bucket(), Some("blobs"));
            assert!(config.blob_storage.s3.virtual_host);
            assert!(config.telemetry.enable_metrics);
            assert_eq!(
                config.telemetry.endpoint.as_deref(),
                Some("http://collector:4317")
            );
            assert_eq!(config.telemetry.metrics_interval_secs, 10);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        Jail::expect_with(|_jail| {
            assert!(ServerConfig::load(Some(Path::new("missing.yaml"))).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("blobgate.yaml", "blob_storage:\n  backend: local\n")?;
            jail.set_env("BLOBGATE_BLOB_STORAGE__BACKEND", "db");
            jail.set_env("BLOBGATE_STRUCTURED_LOGGING", "true");
            let config =
                ServerConfig::load(Some(Path::new("blobgate.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.blob_storage.kind(), StorageKind::Db);
            assert!(config.structured_logging);
            Ok(())
        });
    }

    #[test]
    fn test_legacy_env() {
        Jail::expect_with(|jail| {
            jail.set_env("STORAGE_BACKEND", "S3");
            jail.set_env("S3_ENDPOINT", "https://s3.eu-west-1.amazonaws.com");
            jail.set_env("S3_BUCKET", "legacy");
            jail.set_env("S3_ACCESS_KEY", "AKID");
            jail.set_env("LOCAL_STORAGE_PATH", "/srv/blobs");
            let config = ServerConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.blob_storage.kind(), StorageKind::S3);
            assert_eq!(config.blob_storage.s3.bucket(), Some("legacy"));
            assert_eq!(config.blob_storage.s3.access_key(), Some("AKID"));
            assert_eq!(config.blob_storage.local_path, "/srv/blobs");

            jail.set_env("BLOBGATE_BLOB_STORAGE__S3__BUCKET", "prefixed");
            let config = ServerConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.blob_storage.s3.bucket(), Some("prefixed"));
            Ok(())
        });
    }

    #[test]
    fn test_validate() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.listen_addr = "not an address".to_string();
        assert!(config.validate().is_err());
        config.listen_addr = "127.0.0.1:8900".to_string();

        config.blob_storage.backend = "s3".to_string();
        assert!(config.validate().is_err());

        config.blob_storage.s3.endpoint = Some("localhost:9000".to_string());
        config.blob_storage.s3.bucket = Some("blobs".to_string());
        assert!(config.validate().is_err());

        config.blob_storage.s3.endpoint = Some("http://localhost:9000".to_string());
        assert!(config.validate().is_ok());

        config.blob_storage.s3.bucket = Some("  ".to_string());
        assert!(config.validate().is_err());
        config.blob_storage.backend = "local".to_string();

        config.telemetry.enable_metrics = true;
        config.telemetry.metrics_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_token_disables_auth() {
        let config = ServerConfig {
            api_token: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(config.api_token(), None);
    }
}
