use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
    pub control_plane: ControlPlaneConfig,
    pub coordinator: CoordinatorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable, for running from a terminal.
    #[default]
    Pretty,
    /// One JSON object per line, for hosted runs.
    Json,
}

/// Settings for the endpoint being reconciled and the resources created per attempt.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeploymentConfig {
    /// Stable name of the endpoint. Never changes across deployments.
    #[serde(default = "default_endpoint_name")]
    pub endpoint_name: String,

    /// Prefix of every registered model name. The invocation timestamp is appended.
    #[serde(default = "default_model_name_prefix")]
    pub model_name_prefix: String,

    /// Execution identity the hosted model runs as (role reference).
    pub execution_role: String,

    /// Name of the single production variant.
    #[serde(default = "default_variant_name")]
    pub variant_name: String,

    /// Instance type hosting the variant.
    #[serde(default = "default_instance_type")]
    pub instance_type: String,

    /// Number of instances hosting the variant.
    #[serde(default = "default_instance_count")]
    pub instance_count: u32,

    /// Traffic weight of the variant.
    #[serde(default = "default_variant_weight")]
    pub variant_weight: f32,

    /// Upper bound on the convergence wait (seconds).
    #[serde(default = "default_convergence_timeout")]
    pub convergence_timeout_secs: u64,

    /// How often the endpoint status is polled while converging (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_endpoint_name() -> String {
    "news-headlines-endpoint".to_string()
}

fn default_model_name_prefix() -> String {
    "news-headlines-".to_string()
}

fn default_variant_name() -> String {
    "variant-1".to_string()
}

fn default_instance_type() -> String {
    "ml.m5.xlarge".to_string()
}

fn default_instance_count() -> u32 {
    1
}

fn default_variant_weight() -> f32 {
    1.0
}

fn default_convergence_timeout() -> u64 {
    3600 // 120 polls of 30 seconds
}

fn default_poll_interval() -> u64 {
    30_000
}

/// Settings for the approval-notification handler.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriggerConfig {
    /// Bucket holding the approved-artifact pointer.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Key of the approved-artifact pointer.
    #[serde(default = "default_object_key")]
    pub object_key: String,

    /// Only approvals of this model family are promoted.
    #[serde(default = "default_model_family")]
    pub model_family: String,

    /// Expected `source` of every inbound notification.
    #[serde(default = "default_expected_source")]
    pub expected_source: String,

    /// Expected `detail-type` of every inbound notification.
    #[serde(default = "default_expected_detail_type")]
    pub expected_detail_type: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            object_key: default_object_key(),
            model_family: default_model_family(),
            expected_source: default_expected_source(),
            expected_detail_type: default_expected_detail_type(),
        }
    }
}

fn default_bucket() -> String {
    "model-approvals".to_string()
}

fn default_object_key() -> String {
    "approved-model.json".to_string()
}

fn default_model_family() -> String {
    "news-headlines".to_string()
}

fn default_expected_source() -> String {
    "aws.sagemaker".to_string()
}

fn default_expected_detail_type() -> String {
    "SageMaker Model Package State Change".to_string()
}

/// Filesystem blob store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlobStoreConfig {
    /// Root directory; each bucket is a subdirectory.
    #[serde(default = "default_blob_root")]
    pub root: PathBuf,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            root: default_blob_root(),
        }
    }
}

fn default_blob_root() -> PathBuf {
    PathBuf::from("blobs")
}

/// Remote model/endpoint control plane
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlPlaneConfig {
    /// Base URL (e.g., "http://localhost:9400")
    pub url: String,
    /// Bearer token sent with every request
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

/// Pipeline coordinator that receives job outcomes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoordinatorConfig {
    /// Base URL (e.g., "http://localhost:9500")
    pub url: String,
    /// Bearer token sent with every request
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub deployment: DeploymentConfig,
    pub trigger: TriggerConfig,
    pub blob_store: BlobStoreConfig,
    pub control_plane: SanitizedRemoteConfig,
    pub coordinator: SanitizedRemoteConfig,
}

/// Remote service config with the API key hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRemoteConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            logging: config.logging.clone(),
            deployment: config.deployment.clone(),
            trigger: config.trigger.clone(),
            blob_store: config.blob_store.clone(),
            control_plane: SanitizedRemoteConfig {
                url: config.control_plane.url.clone(),
                api_key_configured: config.control_plane.api_key.is_some(),
                timeout_secs: config.control_plane.timeout_secs,
            },
            coordinator: SanitizedRemoteConfig {
                url: config.coordinator.url.clone(),
                api_key_configured: config.coordinator.api_key.is_some(),
                timeout_secs: config.coordinator.timeout_secs,
            },
        }
    }
}
