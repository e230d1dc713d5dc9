//! Per-service adaptive throttling: sliding request-count window plus
//! consecutive-burst cooldown, shared by blocking and cooperative callers.

pub mod policy;
pub mod registry;
pub mod state;

pub use policy::RateLimitPolicy;
pub use registry::RateLimiterRegistry;
pub use state::{DelayReason, RateLimitDecision};
