mod api;
pub mod dto;
pub mod extract;
mod jobs;
pub mod response;
mod router;

pub use jobs::spawn_stats_recorder;
pub use router::{AppState, create_router};
