pub mod advisor;
pub mod qvalues;
pub mod state;

pub use advisor::Advisor;
pub use qvalues::QValues;
pub use state::InteractionState;
