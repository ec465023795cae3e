pub mod classify;
pub mod monitoring;
pub mod poller;
pub mod shutdown;
pub mod status;
