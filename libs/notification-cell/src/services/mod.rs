pub mod channels;
pub mod content;
pub mod dispatcher;
