//! Dualstore Facade
//!
//! Entry point for domain modules migrating between a legacy and a target
//! store.
//!
//! - [`RepositoryFacade`]: routes each call by cutover phase, compares dual
//!   results and records drift without blocking the caller
//! - [`MigrationRuntime`]: composition root holding the shared controller,
//!   recorder and diff store
//! - [`domains`]: families, tasks, inventory and meals with their
//!   comparison rules
//! - [`MigrationConfig`]: TOML configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use dualstore_facade::domains::Tasks;
//! use dualstore_facade::{MigrationConfig, MigrationRuntime};
//! # use dualstore_core::StoreAdapter;
//! # use std::sync::Arc;
//! # async fn run(
//! #     legacy: Arc<dyn StoreAdapter<Tasks>>,
//! #     target: Arc<dyn StoreAdapter<Tasks>>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = MigrationConfig::load("dualstore.toml").await?;
//! let runtime = MigrationRuntime::start(config).await?;
//! let tasks = runtime.facade::<Tasks>(legacy, target);
//!
//! let open = tasks.read("t-42".to_string()).await?;
//! println!("{open:?}");
//!
//! tasks.quiesce().await;
//! runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
pub mod domains;
mod error;
mod facade;
mod runtime;
pub mod telemetry;

pub use config::{ClassificationRow, MigrationConfig};
pub use domains::MigratedDomain;
pub use error::{ConfigError, FacadeError};
pub use facade::{RepositoryFacade, DEFAULT_SHADOW_TIMEOUT};
pub use runtime::MigrationRuntime;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
