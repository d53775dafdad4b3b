//! Replication engine
//!
//! Everything between the public storage facade and the journal lives
//! here. A mutation flows submitter -> journal -> dispatch loop ->
//! sink -> store, and the coordinator carries the apply outcome back
//! to the caller that submitted it.

pub mod coordinator;
pub mod dispatch;
pub mod sink;
pub mod storage;
pub mod submitter;

pub use coordinator::{Applied, PendingRequest, RequestCoordinator};
pub use dispatch::{DispatchLoop, LoopState};
pub use sink::Sink;
pub use storage::RegistryStorage;
pub use submitter::Submitter;
