use log::{debug, trace, warn};
use rand::{SeedableRng, rngs::StdRng};

use super::{
    Chip8Config, Chip8Error, Chip8Result, Display, Keypad, Memory, Opcode, Timers, display,
    memory::{MEMORY_SIZE, ROM_START_ADDRESS},
    stack::CallStack,
};
use crate::{u4, u12};

/// CHIP-8 virtual machine state
pub struct Chip8 {
    /// 4KB memory with the font at 0x050
    pub(crate) memory: Memory,
    /// Display buffer: 64x32 monochrome pixels
    pub(crate) display: Display<bool>,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u12,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Call stack for subroutine returns
    pub(crate) stack: CallStack,

    pub(crate) timers: Timers,
    pub(crate) keypad: Keypad,

    /// Register that receives the key while FX0A is suspended
    pub(crate) key_wait: Option<u4>,
    /// Fault that stopped dispatch, cleared by `reset`
    pub(crate) fault: Option<Chip8Error>,

    pub(crate) rng: StdRng,
    config: Chip8Config,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::with_config(Chip8Config::default())
    }

    pub fn with_config(config: Chip8Config) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Chip8 {
            memory: Memory::new(),
            display: display::blank(),
            pc: ROM_START_ADDRESS as u16,
            i: u12::default(),
            v: [0; 16],
            stack: CallStack::new(config.stack_depth),
            timers: Timers::default(),
            keypad: Keypad::new(),
            key_wait: None,
            fault: None,
            rng,
            config,
        }
    }

    pub fn config(&self) -> &Chip8Config {
        &self.config
    }

    /// Returns the VM to its power-on state: blank memory except the font,
    /// PC at 0x200 and every register, timer, key and pixel cleared.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.display = display::blank();
        self.pc = ROM_START_ADDRESS as u16;
        self.i = u12::default();
        self.v = [0; 16];
        self.stack.clear();
        self.timers = Timers::default();
        self.keypad.reset();
        self.key_wait = None;
        self.fault = None;

        debug!("VM reset");
    }

    /// Resets the VM and loads a ROM at 0x200. Execution is not started.
    ///
    /// An oversized ROM is rejected before any state is touched.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let max_size = MEMORY_SIZE - ROM_START_ADDRESS;
        if rom.len() > max_size {
            return Err(Chip8Error::ProgramTooLarge {
                size: rom.len(),
                max_size,
            });
        }

        self.reset();
        self.memory.load_program(rom)?;

        debug!("Loaded {} byte program at {:#05X}", rom.len(), ROM_START_ADDRESS);
        Ok(())
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    ///
    /// While FX0A is waiting, a cycle only polls the keypad. After a fault
    /// every cycle fails with `Halted` until the VM is reset.
    pub fn cpu_cycle(&mut self) -> Result<Chip8Result, Chip8Error> {
        if self.fault.is_some() {
            return Err(Chip8Error::Halted);
        }

        let result = match self.key_wait {
            Some(x) => Ok(self.poll_key_wait(x)),
            None => self.fetch().and_then(|opcode| {
                let decoded_opcode = Opcode::decode(opcode);
                trace!("{:03X}: {opcode:04X} {decoded_opcode:?}", self.pc);
                self.execute(decoded_opcode)
            }),
        };

        if let Err(err) = &result {
            warn!("Fault at PC {:03X}: {err}", self.pc);
            self.fault = Some(err.clone());
        }

        result
    }

    /// Updates the delay and sound timers. Should be called at 60Hz.
    pub fn timers_cycle(&mut self) {
        self.timers.tick();
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn is_sound_active(&self) -> bool {
        self.timers.is_sound_active()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keypad.set_key(key, pressed);
    }

    pub fn display(&self) -> &Display<bool> {
        &self.display
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn get_display_pixel(&self, y: usize, x: usize) -> bool {
        self.display[y][x]
    }

    pub fn is_waiting_for_key(&self) -> bool {
        self.key_wait.is_some()
    }

    /// The fault that halted dispatch, if any.
    pub fn fault(&self) -> Option<&Chip8Error> {
        self.fault.as_ref()
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn i(&self) -> u12 {
        self.i
    }

    pub fn v(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn stack(&self) -> &[u16] {
        self.stack.frames()
    }

    pub fn delay_timer(&self) -> u8 {
        self.timers.delay
    }

    pub fn sound_timer(&self) -> u8 {
        self.timers.sound
    }

    pub fn keypad(&self) -> &[bool; 16] {
        self.keypad.keys()
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        self.memory.as_bytes()
    }

    /// Fetches the next 16-bit opcode from memory.
    fn fetch(&self) -> Result<u16, Chip8Error> {
        let pc = self.pc as usize;
        if pc > MEMORY_SIZE - 2 {
            return Err(Chip8Error::AddressOutOfRange { address: pc });
        }

        let high = self.memory.read(pc)?;
        let low = self.memory.read(pc + 1)?;

        Ok(u16::from_be_bytes([high, low]))
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
