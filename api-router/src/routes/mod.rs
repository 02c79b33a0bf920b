pub mod cache;
pub mod chat;
pub mod liveness;
pub mod readiness;
