//! Non-persistent storage

mod memory;

pub use memory::InMemoryRepositoryProvider;

#[cfg(test)]
pub(crate) use memory::FailingJointWrites;
