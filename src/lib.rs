pub mod cli;
pub mod config;
pub mod error;
pub mod hosting;
pub mod http;
pub mod index;
pub mod link;
pub mod package;
pub mod render;
pub mod runtime;
pub mod server;
