//! Example: Arm the panel in stay mode, then disarm it.

use tuxedo_bridge::{PanelConfig, TargetState, TuxedoBridge};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = PanelConfig::builder()
        .host("192.168.1.50")
        .alarm_code("1234")
        .build();

    let mut bridge = TuxedoBridge::start(config).await?;

    let snapshot = bridge.snapshot().await;
    println!(
        "Panel: current={} target={} fault={}",
        snapshot.current, snapshot.target, snapshot.fault
    );

    println!("\nArming in stay mode...");
    bridge.set_target_state(TargetState::StayArmed).await;

    // Exit delay countdowns show up as "NN Secs Remaining"
    tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
    println!("Current state: {}", bridge.current_state().await);

    println!("\nDisarming...");
    bridge.set_target_state(TargetState::Ready).await;

    tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
    println!("Current state: {}", bridge.current_state().await);
    println!("Last armed target: {}", bridge.last_target());

    bridge.shutdown();
    Ok(())
}
