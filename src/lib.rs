pub mod auth;
pub mod banner;
pub mod client;
pub mod config;
pub mod consts;
pub mod error;
pub mod gateway;
pub mod image;
pub mod provider;
pub mod server;
pub mod session;
pub mod spinner;
