// HTTP middleware implementations

pub mod identity; // Forwarded user identity
pub mod metrics; // Request count and latency
