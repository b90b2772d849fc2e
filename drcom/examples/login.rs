//! Log in, keep the session alive until Ctrl-C, then disconnect
//!
//! ```text
//! DRCOM_USERNAME=student01 DRCOM_PASSWORD=secret DRCOM_HOST_IP=10.30.22.17 \
//! DRCOM_MAC=20:68:9d:f3:d0:66 RUST_LOG=drcom=debug cargo run --example login
//! ```

use std::env;
use std::net::Ipv4Addr;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use drcom::{Client, ClientConfig, Credentials, HostProfile, MacAddress};

fn var(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} is not set", name))
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drcom=info")),
        )
        .init();

    let server = var_or("DRCOM_SERVER", drcom::DEFAULT_SERVER);
    let credentials = Credentials::new(var("DRCOM_USERNAME")?, var("DRCOM_PASSWORD")?)?;

    let ip: Ipv4Addr = var("DRCOM_HOST_IP")?
        .parse()
        .context("DRCOM_HOST_IP is not an IPv4 address")?;
    let mac: MacAddress = var("DRCOM_MAC")?.parse()?;
    let host = HostProfile::new(
        ip,
        var_or("DRCOM_HOSTNAME", "DRCOM-CLIENT"),
        mac,
        var_or("DRCOM_OS", "WINDOWS"),
    );

    println!("Logging in to {} as {}...", server, credentials.username());

    let mut client = Client::new(ClientConfig::new(server));
    client.login(credentials, &host).await?;
    client.start_heartbeat()?;

    println!("Online. Press Ctrl-C to disconnect.");

    tokio::signal::ctrl_c().await?;

    let session = client.session();
    println!(
        "Keep-alives sent: {}, failed: {}",
        session.heartbeats_sent(),
        session.heartbeat_failures()
    );

    client.disconnect().await?;
    println!("Disconnected");

    Ok(())
}
