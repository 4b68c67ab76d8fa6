pub mod allocator;
pub mod booking;
pub mod lifecycle;
