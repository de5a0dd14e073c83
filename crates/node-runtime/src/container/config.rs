//! # Node Configuration
//!
//! Unified configuration for every region hosted by this process.
//!
//! A node runs in one of two modes:
//!
//! - **Single region**: `REGION` names the region and `RR_HTTP_ADDR` its
//!   listener. To replicate with a peer process, one node hosts the log
//!   (`RR_LOG_LISTEN=0.0.0.0:9000`) and the other joins it
//!   (`RR_LOG_URL=http://us-host:9000`). With neither set the log lives
//!   only in this process and nothing replicates.
//! - **Local cluster**: `RR_REGIONS=us=127.0.0.1:3000,eu=127.0.0.1:3001`
//!   hosts each listed region in this process on one shared in-memory log.

use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use region_telemetry::TelemetryConfig;
use rr_02_idempotency_guard::IdempotencyConfig;
use rr_03_replication::ReplicationConfig;
use rr_04_command_handler::CommandConfig;
use rr_05_api_gateway::GatewayConfig;
use shared_bus::DEFAULT_PARTITIONS;
use shared_types::RegionId;

/// A region hosted by this process and where its HTTP surface listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEndpoint {
    pub region: RegionId,
    pub http_addr: SocketAddr,
}

/// Where this node's replication log lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// Serve the in-process log to other nodes on this address.
    pub listen: Option<SocketAddr>,
    /// Join the log served by another node at this base URL.
    pub url: Option<String>,
}

impl LogConfig {
    /// Load from `RR_LOG_LISTEN` and `RR_LOG_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen = match non_empty_var("RR_LOG_LISTEN") {
            Some(raw) => Some(
                raw.parse()
                    .map_err(|_| ConfigError::InvalidLogListen(raw.clone()))?,
            ),
            None => None,
        };
        Ok(Self {
            listen,
            url: non_empty_var("RR_LOG_URL"),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Hosted regions. Exactly one outside local cluster mode.
    pub regions: Vec<RegionEndpoint>,
    /// Partition count of the in-memory log.
    pub partitions: u32,
    /// RocksDB directory. Each region opens `{store_path}/{region}`.
    pub store_path: Option<PathBuf>,
    pub log: LogConfig,
    pub idempotency: IdempotencyConfig,
    /// Template; `region` is overridden per hosted region.
    pub replication: ReplicationConfig,
    /// Template; `region` is overridden per hosted region.
    pub command: CommandConfig,
    /// Template; `http_addr` is overridden per hosted region.
    pub gateway: GatewayConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let replication = ReplicationConfig::default();
        let gateway = GatewayConfig::default();
        Self {
            regions: vec![RegionEndpoint {
                region: replication.region.clone(),
                http_addr: gateway.http_addr,
            }],
            partitions: DEFAULT_PARTITIONS,
            store_path: None,
            log: LogConfig::default(),
            idempotency: IdempotencyConfig::default(),
            command: CommandConfig::for_region(replication.region.clone()),
            replication,
            gateway,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RR_REGIONS`: `name=addr,...` enables local cluster mode
    /// - `RR_PARTITIONS`: Log partitions (default: 8)
    /// - `RR_STORE_PATH`: RocksDB directory (requires the `rocksdb` feature)
    /// - `RR_LOG_LISTEN`: Serve this node's log to peers on this address
    /// - `RR_LOG_URL`: Join the log served by a peer
    ///
    /// Plus every variable read by the subsystem configurations.
    pub fn from_env() -> Result<Self, ConfigError> {
        let replication = ReplicationConfig::from_env();
        let command = CommandConfig::from_env();
        let gateway = GatewayConfig::from_env();

        let regions = match env::var("RR_REGIONS") {
            Ok(list) if !list.trim().is_empty() => parse_regions(&list)?,
            _ => vec![RegionEndpoint {
                region: replication.region.clone(),
                http_addr: gateway.http_addr,
            }],
        };

        let partitions = match env::var("RR_PARTITIONS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPartitions(raw.clone()))?,
            Err(_) => DEFAULT_PARTITIONS,
        };

        let config = Self {
            regions,
            partitions,
            store_path: non_empty_var("RR_STORE_PATH").map(PathBuf::from),
            log: LogConfig::from_env()?,
            idempotency: IdempotencyConfig::from_env(),
            replication,
            command,
            gateway,
            telemetry: TelemetryConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the runtime cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.regions.is_empty() {
            return Err(ConfigError::NoRegions);
        }
        if self.partitions == 0 {
            return Err(ConfigError::InvalidPartitions("0".into()));
        }

        let mut names = HashSet::new();
        let mut addrs = HashSet::new();
        for endpoint in &self.regions {
            if !names.insert(endpoint.region.clone()) {
                return Err(ConfigError::DuplicateRegion(endpoint.region.to_string()));
            }
            if !addrs.insert(endpoint.http_addr) {
                return Err(ConfigError::DuplicateAddress(endpoint.http_addr));
            }
        }

        if self.store_path.is_some() && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::RocksDbDisabled);
        }
        if self.log.listen.is_some() && self.log.url.is_some() {
            return Err(ConfigError::ConflictingLog);
        }
        if let Some(url) = &self.log.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidLogUrl(url.clone()));
            }
        }
        Ok(())
    }

    /// Whether any other region can read what this node publishes.
    #[must_use]
    pub fn has_shared_log(&self) -> bool {
        self.is_local_cluster() || self.log.listen.is_some() || self.log.url.is_some()
    }

    /// Whether several regions share this process.
    #[must_use]
    pub fn is_local_cluster(&self) -> bool {
        self.regions.len() > 1
    }

    /// Store directory for `region`, if persistence is configured.
    #[must_use]
    pub fn store_path_for(&self, region: &RegionId) -> Option<PathBuf> {
        self.store_path
            .as_deref()
            .map(|root: &Path| root.join(region.as_str()))
    }

    /// Replication configuration for one hosted region.
    #[must_use]
    pub fn replication_for(&self, region: &RegionId) -> ReplicationConfig {
        ReplicationConfig {
            region: region.clone(),
            ..self.replication.clone()
        }
    }

    /// Command configuration for one hosted region.
    #[must_use]
    pub fn command_for(&self, region: &RegionId) -> CommandConfig {
        CommandConfig {
            region: region.clone(),
            ..self.command.clone()
        }
    }
}

/// Parse `name=addr,name=addr`. Whitespace around entries is ignored.
pub fn parse_regions(list: &str) -> Result<Vec<RegionEndpoint>, ConfigError> {
    let mut endpoints = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, addr) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidRegionEntry(entry.to_string()))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidRegionEntry(entry.to_string()));
        }

        let http_addr = addr
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidAddress {
                region: name.to_string(),
                addr: addr.trim().to_string(),
            })?;

        endpoints.push(RegionEndpoint {
            region: RegionId::new(name),
            http_addr,
        });
    }

    if endpoints.is_empty() {
        return Err(ConfigError::NoRegions);
    }
    Ok(endpoints)
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No region to host.
    NoRegions,
    /// An `RR_REGIONS` entry is not `name=addr`.
    InvalidRegionEntry(String),
    /// An `RR_REGIONS` address does not parse.
    InvalidAddress { region: String, addr: String },
    /// The same region is listed twice.
    DuplicateRegion(String),
    /// Two regions share a listener.
    DuplicateAddress(SocketAddr),
    /// `RR_PARTITIONS` is not a positive integer.
    InvalidPartitions(String),
    /// `RR_STORE_PATH` is set but RocksDB support is compiled out.
    RocksDbDisabled,
    /// `RR_LOG_LISTEN` is not a socket address.
    InvalidLogListen(String),
    /// `RR_LOG_URL` is not an http(s) URL.
    InvalidLogUrl(String),
    /// Both `RR_LOG_LISTEN` and `RR_LOG_URL` are set.
    ConflictingLog,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoRegions => write!(f, "no region configured"),
            ConfigError::InvalidRegionEntry(entry) => {
                write!(f, "RR_REGIONS entry '{}' is not of the form name=addr", entry)
            }
            ConfigError::InvalidAddress { region, addr } => {
                write!(f, "region '{}' has an invalid listen address '{}'", region, addr)
            }
            ConfigError::DuplicateRegion(region) => {
                write!(f, "region '{}' is configured more than once", region)
            }
            ConfigError::DuplicateAddress(addr) => {
                write!(f, "listen address {} is used by more than one region", addr)
            }
            ConfigError::InvalidPartitions(raw) => {
                write!(f, "RR_PARTITIONS must be a positive integer, got '{}'", raw)
            }
            ConfigError::RocksDbDisabled => write!(
                f,
                "RR_STORE_PATH is set but this binary was built without the rocksdb feature"
            ),
            ConfigError::InvalidLogListen(raw) => {
                write!(f, "RR_LOG_LISTEN '{}' is not a socket address", raw)
            }
            ConfigError::InvalidLogUrl(url) => {
                write!(f, "RR_LOG_URL '{}' must start with http:// or https://", url)
            }
            ConfigError::ConflictingLog => write!(
                f,
                "RR_LOG_LISTEN and RR_LOG_URL are exclusive: a node either hosts the log or joins one"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
