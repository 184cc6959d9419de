use std::sync::Arc;

use services::{ProgressStore, ResultSync};

use crate::views::{ResultsPanel, TrackerPanel};

/// What the composition root provides to the views.
pub trait UiApp: Send + Sync {
    fn progress(&self) -> Arc<ProgressStore>;

    /// A fresh coordinator; each results panel owns its own.
    fn result_sync(&self) -> ResultSync;
}

#[derive(Clone)]
pub struct AppContext {
    app: Arc<dyn UiApp>,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            app: Arc::clone(app),
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        self.app.progress()
    }

    #[must_use]
    pub fn tracker_panel(&self) -> TrackerPanel {
        TrackerPanel::new(self.app.progress())
    }

    #[must_use]
    pub fn results_panel(&self) -> ResultsPanel {
        ResultsPanel::new(self.app.result_sync())
    }
}

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}
