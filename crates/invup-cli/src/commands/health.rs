//! Health command - query the backend's health endpoint.

use std::process::ExitCode;

use console::style;

use invup_core::HttpBackend;

use super::{GlobalOpts, load_config};

pub async fn run(opts: &GlobalOpts) -> anyhow::Result<ExitCode> {
    let config = load_config(opts)?;
    let client = HttpBackend::build_client(&config)?;
    let backend = HttpBackend::from_config(client, &config);

    println!("Backend: {}", backend.base_url());

    let health = backend.health().await?;
    let status = if health.is_healthy() {
        style(health.status.as_str()).green()
    } else {
        style(health.status.as_str()).red()
    };
    println!("Status: {}", status);

    if let Some(gemini) = &health.gemini {
        println!("Gemini: {}", gemini);
    }
    if let Some(ts) = health.timestamp {
        if let Some(at) = chrono::DateTime::from_timestamp(ts as i64, 0) {
            println!("Checked at: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }

    Ok(if health.is_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
