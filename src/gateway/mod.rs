//! Gateway state: the durable record used to resume allocation after a restart.

pub mod binary;
pub mod document;
mod node_states;
mod state;
mod store;

pub use node_states::NodeGatewayStates;
pub use state::{GatewayState, GatewayStateBuilder};
pub use store::GatewayStore;
