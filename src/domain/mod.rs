pub mod change_event;
pub mod check_history;
pub mod errors;
pub mod ports;
pub mod snapshot;
pub mod value_objects;
