pub mod backup;
pub mod calc;
pub mod config;
pub mod gate;
pub mod ipc;
pub mod query;
pub mod records;
pub mod registry;
