//! # Configuration Module
//!
//! Settings are layered from:
//! - Code defaults
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - Environment variables (prefixed with APP__) and .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_hub::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Hub will listen on {}", settings.server_addr());
//! ```

mod settings;

pub use settings::*;
