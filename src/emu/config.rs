use super::stack::DEFAULT_STACK_DEPTH;

pub const DEFAULT_CPU_HZ: u32 = 700;
pub const TIMER_HZ: u32 = 60;

/// Tunables for a single VM instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chip8Config {
    /// Instruction clock rate.
    pub cpu_hz: u32,
    /// Maximum number of nested subroutine calls.
    pub stack_depth: usize,
    /// Seed for CXNN; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for Chip8Config {
    fn default() -> Self {
        Self {
            cpu_hz: DEFAULT_CPU_HZ,
            stack_depth: DEFAULT_STACK_DEPTH,
            rng_seed: None,
        }
    }
}
