pub mod config;
pub mod logging;

pub mod batch;
pub mod checksum;
pub mod downloader;
pub mod manifest;
pub mod paths;
pub mod progress;
pub mod storage;
