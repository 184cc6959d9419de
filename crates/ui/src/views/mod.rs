mod results;
mod tracker;

pub use results::ResultsPanel;
pub use tracker::TrackerPanel;
