pub mod config;
pub mod logging;

pub mod automation;
pub mod autostart;
pub mod checksum;
pub mod dispatch;
pub mod download;
pub mod http_request;
pub mod output_path;
pub mod run;
pub mod storage;
pub mod variant;
