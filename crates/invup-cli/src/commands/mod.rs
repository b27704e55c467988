//! CLI subcommands and the service wiring they share.

pub mod batch;
pub mod config;
pub mod health;
pub mod probe;
pub mod render;
pub mod upload;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use invup_core::models::config::InvupConfig;
use invup_core::telemetry::{MeasurementProtocolSink, NoopSink, TelemetrySink};
use invup_core::{FirebaseStorage, HttpBackend, UploadOrchestrator, fetch_firebase_config};

/// Options accepted by every subcommand.
pub struct GlobalOpts {
    pub config: Option<PathBuf>,
    pub local: bool,
    pub api_base: Option<String>,
}

impl GlobalOpts {
    /// The configuration file in use.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invup")
        .join("config.json")
}

/// Read the configuration file, or defaults when there is none.
pub fn read_config(path: &Path) -> anyhow::Result<InvupConfig> {
    if path.exists() {
        InvupConfig::from_file(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))
    } else {
        Ok(InvupConfig::default())
    }
}

/// Load the configuration: file, then `.env` and the environment, then flags.
pub fn load_config(opts: &GlobalOpts) -> anyhow::Result<InvupConfig> {
    let mut config = match &opts.config {
        Some(path) => InvupConfig::from_file(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?,
        None => read_config(&default_config_path())?,
    };

    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }
    config.apply_env(|key| std::env::var(key).ok())?;

    if opts.local {
        config.api.local = true;
    }
    if let Some(url) = &opts.api_base {
        config.api.base_url = Some(url.clone());
    }

    Ok(config)
}

/// Services built from the configuration for one command invocation.
pub struct Services {
    pub config: InvupConfig,
    pub client: reqwest::Client,
    pub telemetry: Arc<dyn TelemetrySink>,
    telemetry_task: Option<JoinHandle<()>>,
}

impl Services {
    /// Load the configuration and start the telemetry worker.
    pub async fn connect(opts: &GlobalOpts) -> anyhow::Result<Self> {
        Self::start(load_config(opts)?).await
    }

    /// Start from a loaded configuration.
    ///
    /// Deployed configurations fetch the Firebase settings from the frontend's
    /// config endpoint first.
    pub async fn start(mut config: InvupConfig) -> anyhow::Result<Self> {
        let client = HttpBackend::build_client(&config)?;

        if config.wants_remote_firebase_config() {
            if let Some(url) = &config.api.firebase_config_url {
                config.firebase = fetch_firebase_config(&client, url).await?;
                info!("Loaded Firebase config from {}", url);
            }
        }
        config.validate()?;

        let (telemetry, telemetry_task): (Arc<dyn TelemetrySink>, _) =
            match config.analytics_credentials() {
                Some((measurement_id, api_secret)) => {
                    let (sink, task) = MeasurementProtocolSink::spawn(
                        client.clone(),
                        &config.telemetry.endpoint,
                        measurement_id,
                        api_secret,
                    );
                    (Arc::new(sink), Some(task))
                }
                None => {
                    debug!("Telemetry disabled");
                    (Arc::new(NoopSink), None)
                }
            };

        Ok(Self {
            config,
            client,
            telemetry,
            telemetry_task,
        })
    }

    pub fn backend(&self) -> HttpBackend {
        HttpBackend::from_config(self.client.clone(), &self.config)
    }

    pub fn storage(&self) -> anyhow::Result<FirebaseStorage> {
        Ok(FirebaseStorage::from_config(self.client.clone(), &self.config)?)
    }

    pub fn orchestrator(&self) -> anyhow::Result<UploadOrchestrator<FirebaseStorage, HttpBackend>> {
        Ok(UploadOrchestrator::from_config(
            &self.config,
            self.storage()?,
            self.backend(),
            self.telemetry.clone(),
        )?)
    }

    /// Wait for queued telemetry to be delivered.
    ///
    /// Every orchestrator built from these services must be dropped first.
    pub async fn finish(self) {
        drop(self.telemetry);
        if let Some(task) = self.telemetry_task {
            if let Err(e) = task.await {
                warn!("Telemetry worker failed: {}", e);
            }
        }
    }
}
