//! Shared types, error model, and configuration for imchef.
//!
//! This crate is the foundation depended on by all other imchef crates.
//! It provides:
//! - [`ChefError`], the unified error type
//! - Content-tree types ([`ChannelNode`], [`TopicNode`], [`DocumentNode`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, CacheConfig, ChannelConfig, ContentConfig, DefaultsConfig, RunConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{ChefError, Result};
pub use types::{
    COPYRIGHT_DEFAULT, ChannelInfo, ChannelNode, DocumentFile, DocumentNode, LICENSE_CC_BY,
    ResourceType, Role, TopicChild, TopicNode,
};
