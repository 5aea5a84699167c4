// MIT License - Copyright (c) 2026 Peter Wright
// Target state commands

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::PanelApi;
use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::status::TargetState;

/// Turns requested target states into panel commands.
pub struct CommandDispatcher<P> {
    panel: Arc<P>,
    reconciler: Arc<Reconciler>,
    refresh_before_command: bool,
}

impl<P: PanelApi> CommandDispatcher<P> {
    pub fn new(panel: Arc<P>, reconciler: Arc<Reconciler>, refresh_before_command: bool) -> Self {
        Self {
            panel,
            reconciler,
            refresh_before_command,
        }
    }

    /// Send the command for `requested`.
    ///
    /// Armed targets are remembered before the request goes out; a disarm
    /// is sent without touching the remembered target, which keeps the last
    /// armed mode. Failures are not retried: the next poll reports the real
    /// state.
    pub async fn set_target(&self, requested: TargetState) -> Result<()> {
        debug!("Set target state: {}", requested);

        if self.refresh_before_command {
            debug!("Refreshing panel session before command");
            if let Err(e) = self.panel.refresh_session().await {
                warn!("Session refresh before command failed: {}", e);
            }
        }

        match requested.arm_mode() {
            Some(mode) => {
                self.reconciler.record_optimistic_target(requested);
                info!("Arming panel ({})", mode);
                self.panel.arm(mode).await
            }
            None => {
                info!("Disarming panel");
                self.panel.disarm().await
            }
        }
    }
}
