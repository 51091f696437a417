//! Request handlers for resources and tokens.

mod auth;
mod params;
mod resource;

pub use auth::*;
pub use params::ListParams;
pub use resource::*;

/// Milliseconds since the epoch, as stored in `createdAt`/`updatedAt`.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
