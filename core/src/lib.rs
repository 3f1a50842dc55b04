pub mod agent;
pub mod assignment;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod matcher;
pub mod reasoner;
pub mod recommendation;
pub mod roster;
pub mod scorer;
pub mod source;
pub mod store;
pub mod ticket;
pub mod types;
pub mod workload;
