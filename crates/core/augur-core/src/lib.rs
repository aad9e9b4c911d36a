//! # Augur Core
//!
//! Shared foundation for the Augur belief engine:
//!
//! - **Types**: hypotheses, variables, observations, per-agent state
//! - **Variables**: conjugate Bayesian updates for seven variable kinds
//! - **Persistence**: the [`StateStore`](types::StateStore) contract
//! - **Ambient**: errors, configuration, logging

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod logging;
pub mod types;
pub mod variables;

pub use config::AugurConfig;
pub use error::{AugurError, Result};
pub use logging::init_logging;
pub use types::*;
pub use variables::{initialize, summarize, update, update_checked, VariableSummary};
