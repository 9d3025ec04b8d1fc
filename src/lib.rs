pub mod config;
pub mod duration;
pub mod fetch;
pub mod format;
pub mod models;
pub mod products;
pub mod report;
pub mod store;
pub mod sync;
pub mod timestamp;
