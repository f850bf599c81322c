pub mod audit;
pub mod broker;
pub mod code;
pub mod config;
pub mod error;
pub mod event;
pub mod handlers;
pub mod router;
pub mod service;
pub mod state;
pub mod store;
