//! Example: Query a Tuxedo panel once and print its reconciled state.

use tuxedo_bridge::{classify, PanelApi, PanelClient, PanelConfig, Reconciler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = PanelConfig::builder()
        .host("192.168.1.50")
        .build();

    let client = PanelClient::new(&config)?;
    let reconciler = Reconciler::new();

    println!("Querying {}...", client.base_url());
    let raw = client.query_status().await;

    println!("  Raw status:     {}", raw);
    println!("  Classification: {:?}", classify(&raw));

    let current = reconciler.reconcile_current(&raw);
    let target = reconciler.reconcile_target(&raw);
    println!("  Current state:  {} (fault={})", current.state, current.faulted);
    println!("  Target state:   {}", target.state);
    println!("  Entry delay:    {}", Reconciler::is_entry_delay(&raw));

    Ok(())
}
