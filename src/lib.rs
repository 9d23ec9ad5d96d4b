pub mod analytics;
pub mod cache;
pub mod config;
pub mod export;
pub mod load;
pub mod process;
pub mod synthetic;
pub mod table;
