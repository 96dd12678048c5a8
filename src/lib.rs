pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod greenlake;
pub mod ilo;
#[cfg(feature = "cli")]
pub mod logging;
pub mod oneview;
pub mod rest;
pub mod store;
