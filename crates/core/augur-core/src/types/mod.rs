//! Core data model

pub mod hypothesis;
pub mod observation;
pub mod proposal;
pub mod state;
pub mod store;
pub mod variable;

pub use hypothesis::*;
pub use observation::*;
pub use proposal::*;
pub use state::*;
pub use store::*;
pub use variable::*;
