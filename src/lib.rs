pub mod cli;
pub mod errors;
pub mod models;
pub mod query;
pub mod runner;
pub mod server;
pub mod storage;
