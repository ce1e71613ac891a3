//! Identity register: the lookup contract and an in-memory backend.

mod memory;
mod traits;

pub use memory::{InMemoryRegister, Membership};
pub use traits::{IdentityRegister, PersonId};
