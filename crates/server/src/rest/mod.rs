mod alerts;
mod health;
mod metrics;
mod receivers;
mod router;
mod status;

pub use router::{router, AppState};
