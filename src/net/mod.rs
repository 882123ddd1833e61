//! Network address and transport socket wrappers

pub mod addr;
pub mod socket;

pub use socket::{ConnSocket, RendezvousSocket, SocketKind};
