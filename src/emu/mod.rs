mod chip8;
mod config;
pub mod display;
mod execute;
mod keypad;
pub mod memory;
mod opcode;
mod runner;
pub mod stack;
mod threaded;
mod timers;
mod types;

pub use chip8::*;
pub use config::*;
pub use keypad::*;
pub use memory::Memory;
pub use opcode::*;
pub use runner::*;
pub use threaded::*;
pub use timers::*;
pub use types::*;
