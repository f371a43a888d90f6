pub mod config;
pub mod dashboard;
pub mod extract;
pub mod http_client;
pub mod logging;
pub mod parquet_io;
pub mod pipeline;
pub mod registry;
pub mod resolve;
pub mod stats_api;
pub mod table;
pub mod transform;
