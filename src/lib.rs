pub mod api;
pub mod archive;
pub mod config;
pub mod db;
pub mod moon;
pub mod store;
