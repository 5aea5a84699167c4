// MIT License - Copyright (c) 2026 Peter Wright
// Library root
//
//! # tuxedo-bridge
//!
//! Bridges the HTTP status API of Honeywell Tuxedo Touch / VAM security
//! panels to a small, normalized security-state model.
//!
//! The panel reports free-text statuses ("Armed Stay Fault", "12 Secs
//! Remaining", "Not available", ...). This library classifies them,
//! smooths transient and unavailable readings against last-known-good
//! values, keeps the target state within the arm/disarm domain, and
//! issues arm/disarm commands.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tuxedo_bridge::{BridgeEvent, PanelConfig, TuxedoBridge};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PanelConfig::builder()
//!         .host("192.168.1.50")
//!         .alarm_code("1234")
//!         .polling(true)
//!         .build();
//!
//!     let mut bridge = TuxedoBridge::start(config).await?;
//!
//!     let mut events = bridge.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let BridgeEvent::CurrentStateChanged(state) = event {
//!                 println!("Panel is now {state}");
//!             }
//!         }
//!     });
//!
//!     tokio::signal::ctrl_c().await?;
//!     bridge.shutdown();
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod protocol;
pub mod reconciler;
pub mod scheduler;
pub mod status;

// Re-exports for convenience
pub use bridge::{BridgeSnapshot, TuxedoBridge};
pub use client::{PanelApi, PanelClient};
pub use config::{PanelConfig, PanelConfigBuilder, Scheme};
pub use error::{Result, TuxedoError};
pub use event::{BridgeEvent, EventReceiver};
pub use reconciler::{Reading, Reconciler};
pub use status::{classify, ArmMode, Classification, NormalizedState, RawStatus, TargetState};
