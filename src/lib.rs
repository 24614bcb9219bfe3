pub mod config;
pub mod context;
pub mod export;
pub mod http_client;
pub mod logos;
pub mod poller;
pub mod render;
pub mod rounding;
pub mod state;
pub mod status_fetch;
