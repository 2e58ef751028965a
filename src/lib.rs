#![forbid(unsafe_code)]

pub mod build;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod documents;
pub mod download;
pub mod export;
pub mod extract;
pub mod formats;
pub mod http;
pub mod logging;
pub mod manifest;
pub mod media;
pub mod nodes;
pub mod outline;
pub mod quiz;
pub mod tree;
pub mod xml;
