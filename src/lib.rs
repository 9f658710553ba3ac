pub mod catalog;
pub mod config;
pub mod engine;
pub mod journal;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod records;
pub mod snapshotter;
pub mod waitlist;
