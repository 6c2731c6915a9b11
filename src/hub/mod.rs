pub mod connection;
pub mod dispatcher;
pub mod reaper;
pub mod registry;
