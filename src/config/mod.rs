// src/config/mod.rs

//! Configuration loading and validation for fsseg.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into the resolved [`DriverConfig`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, DriverConfig, NotifySection, RawConfigFile};
pub use validate::{expand_tilde, parse_duration};
