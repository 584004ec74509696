/// TOML configuration with hot reload.
pub mod toml_config;
