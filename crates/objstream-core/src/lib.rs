pub mod config;
pub mod logging;

pub mod checksum;
pub mod reader;
pub mod request;
pub mod retry;
pub mod segmenter;
pub mod storage;
pub mod transport;
