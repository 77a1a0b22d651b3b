#![allow(clippy::result_large_err)]

pub mod config_store;
pub mod containers;
pub mod fake_driver;
pub mod fixtures;

pub use config_store::InMemoryConfigStore;
pub use fake_driver::{FakeAdapter, FakeAdapterStats};
