//! Example: Poll the panel and print every state change.

use tuxedo_bridge::{BridgeEvent, PanelConfig, TuxedoBridge};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = PanelConfig::builder()
        .host("192.168.1.50")
        .polling(true)
        .poll_interval_ms(5000)
        .build();

    let mut bridge = TuxedoBridge::start(config).await?;
    let mut events = bridge.subscribe();

    println!("Listening for panel events (Ctrl+C to stop)...\n");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(BridgeEvent::CurrentStateChanged(state)) => println!("Current state: {}", state),
                    Ok(BridgeEvent::TargetStateChanged(state)) => println!("Target state:  {}", state),
                    Ok(BridgeEvent::FaultChanged(fault)) => println!("Fault:         {}", fault),
                    Ok(BridgeEvent::EntryDelayChanged(active)) => println!("Entry delay:   {}", active),
                    Ok(event) => println!("Event: {:?}", event),
                    Err(e) => {
                        println!("Event channel error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping...");
                break;
            }
        }
    }

    bridge.shutdown();
    Ok(())
}
