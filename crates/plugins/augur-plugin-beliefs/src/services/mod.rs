//! Services

pub mod belief_service;

pub use belief_service::BeliefService;
