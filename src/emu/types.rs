/// Result type for a single instruction tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chip8Result {
    /// Continue executing instructions.
    Continue,
    /// The framebuffer changed (clear or draw); the renderer may want a new frame.
    DisplayChanged,
    /// Dispatch is suspended on FX0A until a key is pressed.
    WaitingForKey,
}

/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Chip8Error {
    #[error("Invalid instruction: {opcode:#06X}")]
    InvalidInstruction { opcode: u16 },

    #[error("Stack overflow: call stack already holds {depth} return addresses")]
    StackOverflow { depth: usize },

    #[error("Stack underflow: attempted to return from a subroutine with empty call stack")]
    StackUnderflow,

    #[error("Address out of range: {address:#06X}")]
    AddressOutOfRange { address: usize },

    #[error("Write to reserved interpreter memory at address {address:#06X}")]
    ReservedAddress { address: usize },

    #[error("Program is too large ({size} bytes), max size is {max_size} bytes")]
    ProgramTooLarge { size: usize, max_size: usize },

    #[error("VM halted after a fault, reset it before running again")]
    Halted,
}

pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;
/// A type alias for the CHIP-8 display buffer representation
pub type Display<T> = [[T; DISPLAY_X]; DISPLAY_Y];
