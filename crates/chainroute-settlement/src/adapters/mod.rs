//! Collaborator implementations shipped with the engine.

pub mod durability;
pub mod mock;

pub use durability::{MemoryDurability, NoopDurability};
pub use mock::{MockExecutor, MockMixer};
