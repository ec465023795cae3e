pub mod atomic_file;
pub mod json_store;
pub mod log_sink;
