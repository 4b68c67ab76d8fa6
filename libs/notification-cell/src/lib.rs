pub mod models;
pub mod services;

pub use services::channels::{AuditChannel, InAppChannel, InMemoryNoticeStore, NoticeStore, StatsChannel};
pub use services::content::NotificationContentResolver;
pub use services::dispatcher::{NotificationChannel, NotificationDispatcher};
