pub mod directory;
pub mod models;
pub mod services;
pub mod store;

pub use services::booking::BookingService;
