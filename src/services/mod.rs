pub mod bet_tracker;
pub mod head_to_head;
pub mod projection;
pub mod team_analytics;

pub use head_to_head::HeadToHeadAnalyzer;
pub use projection::{project_total, Projection, ProjectionInput};
