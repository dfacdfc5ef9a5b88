//! A CHIP-8 virtual machine.
//!
//! [`emu::Chip8`] holds the whole machine state and executes one instruction
//! per [`emu::Chip8::cpu_cycle`]. [`emu::Chip8Runner`] and
//! [`emu::ThreadedRunner`] drive the instruction clock and the 60Hz timer
//! clock independently.

pub mod emu;
mod nibble;

pub use nibble::{u4, u12};
