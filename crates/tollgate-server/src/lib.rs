// Tollgate server: HTTP front end of the change request review workflow

// Module declarations
pub mod api; // API handlers and routes
pub mod metrics; // Metrics and observability
pub mod middleware; // HTTP middleware
pub mod model; // Configuration, shared state and response envelopes
pub mod startup; // Application startup utilities

pub use model::{AppState, Configuration};
