//! Shared state handed to every request handler.

use crate::engine::{EngineCommand, TelemetryEngine};
use crate::metrics::data::SystemSnapshot;
use crate::metrics::DashboardView;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Read side of the engine plus the queue for actuation requests.
///
/// Handlers never touch collectors directly: reads come from the latest
/// published view and writes are executed on the engine loop.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<SystemSnapshot>,
    pub view: watch::Receiver<Arc<DashboardView>>,
    pub commands: mpsc::Sender<EngineCommand>,
}

impl AppState {
    /// State bound to `engine`, with the receiving end of the command queue
    /// to pass to [`TelemetryEngine::run`].
    pub fn for_engine(
        engine: &TelemetryEngine,
        queue: usize,
    ) -> (Self, mpsc::Receiver<EngineCommand>) {
        let (commands, receiver) = mpsc::channel(queue.max(1));
        let state = Self {
            identity: engine.identity(),
            view: engine.subscribe(),
            commands,
        };
        (state, receiver)
    }

    /// The most recently published view.
    pub fn current_view(&self) -> Arc<DashboardView> {
        self.view.borrow().clone()
    }
}
