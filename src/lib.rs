pub mod aggregate;
pub mod controller;
pub mod data;
pub mod filter;
pub mod logging;
pub mod server;
pub mod state;
pub mod view;
