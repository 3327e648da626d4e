// # State Store Implementations
//
// This module provides implementations of the StateStore trait for
// different persistence strategies, plus the optional remote mirror.

pub mod file;
pub mod memory;
pub mod mirror;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use mirror::GitMirror;
