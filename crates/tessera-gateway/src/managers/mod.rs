//! Concrete process-wide managers.

mod admin;
mod sync;

pub use admin::{PROJECT_ATTRIBUTE, StaticAdminManager};
pub use sync::HttpSyncManager;
