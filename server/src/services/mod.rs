//! Business services; each one owns a slice of the API and talks to the
//! [`Store`](crate::store::Store) port.

pub mod auth;
pub mod dashboard;
pub mod exchange;
pub mod listings;
pub mod moderation;
pub mod upload;

pub use auth::AuthService;
pub use dashboard::DashboardService;
pub use exchange::ExchangeService;
pub use listings::ListingService;
pub use moderation::ModerationService;
pub use upload::{UploadService, UploadedFile};
