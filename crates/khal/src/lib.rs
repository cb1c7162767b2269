//! Hardware Abstraction Layer.
//!
//! Everything the recursive kernel lock needs from an x86_64 core, and the
//! big kernel lock built on top of it.
#![cfg_attr(not(test), no_std)]

pub mod cpu;
pub mod klock;
pub mod platform;
pub mod serial;

pub use platform::X86;
pub use serial::Serial;
