//! Token Management
//!
//! Session token lifecycle: refresh token storage, login status stream,
//! scheduled refresh and the lifecycle manager tying them together.

pub mod manager;
pub mod status;
pub mod store;
pub mod timer;

// Token Store
pub use store::{
    FileRefreshTokenStore, InMemoryRefreshTokenStore, MockRefreshTokenStore, RefreshTokenStore,
    StoreOperation,
};

// Login Status
pub use status::{LoginStatusStream, StatusPublisher};

// Scheduled Refresh
pub use timer::RefreshTimer;

// Lifecycle Manager
pub use manager::{refresh_delay, TokenLifecycleManager};
