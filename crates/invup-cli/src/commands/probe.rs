//! Probe command - check that the storage bucket accepts writes.

use console::style;
use tracing::info;

use invup_core::RemoteStorageClient;

use super::{GlobalOpts, Services};

pub async fn run(opts: &GlobalOpts) -> anyhow::Result<()> {
    let services = Services::connect(opts).await?;
    let bucket = services.config.firebase.storage_bucket.clone();
    info!("Probing bucket {}", bucket);

    let result = {
        let storage = RemoteStorageClient::new(services.storage()?, services.telemetry.clone());
        storage.probe().await
    };
    services.finish().await;

    match result {
        Ok(()) => {
            println!("{} Storage connection successful ({})", style("✓").green(), bucket);
            Ok(())
        }
        Err(e) => anyhow::bail!("Storage connection failed: {}", e),
    }
}
