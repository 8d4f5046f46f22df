// # State
//
// Process-lifetime record of what the engine has dispatched.

pub mod memory;

pub use memory::PublishedState;
