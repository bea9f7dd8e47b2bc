//! Kernel utilities shared by the `flash` crates.
//!
//! ## Config loading
//! ```rust,no_run
//! use flash_kernel::config::{FlashConfig, load_config};
//!
//! let cfg: FlashConfig = load_config(Some("flash.toml")).unwrap();
//! println!("containers default to {}", cfg.vault.container.display());
//! ```

pub mod config;
