pub mod cli;
pub mod config;
pub mod parser;
pub mod version;
