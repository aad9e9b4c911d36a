//! Augur Beliefs Plugin
//!
//! Maintains a persistent probabilistic model of an agent's behavioral traits
//! and task outcomes, and decides what to test next.
//!
//! # Overview
//!
//! - **Engine**: hypothesis lifecycle, evidence application over the
//!   conjugate variable model in `augur-core`, summaries and the autonomous
//!   proposal queue. Pure and synchronous.
//!
//! - **Orchestrator**: maps experiment and mission events onto hypotheses
//!   and observation batches, mirrors trait signals onto the global profile
//!   `global:agent_profile`, and produces the [`BeliefSnapshot`] read model.
//!
//! - **BeliefService**: async read-mutate-write boundary over any
//!   [`StateStore`](augur_core::types::StateStore), serialized per agent.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use augur_plugin_beliefs::{BeliefService, Experiment, Resolution};
//! use augur_storage_local::MemoryStateStore;
//! use std::sync::Arc;
//!
//! let service = BeliefService::new(Arc::new(MemoryStateStore::new()));
//! let riddle = Experiment::new("riddle-1", "Logic riddle").with_type("puzzle");
//!
//! service.initialize_experiment("agent-7", &riddle).await?;
//! service
//!     .resolve_experiment("agent-7", &riddle, &Resolution {
//!         result: Some("Solved it".into()),
//!         score: Some(0.9),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! let snapshot = service.snapshot("agent-7").await?;
//! println!("{:?}", snapshot.global_traits["analytical"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Hypothesis lifecycle, summaries and autonomous proposals
pub mod engine;
/// Experiment and mission entry points
pub mod orchestrator;
/// Async per-agent service
pub mod services;

pub use augur_core::variables;
pub use engine::*;
pub use orchestrator::*;
pub use services::*;
