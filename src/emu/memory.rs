use super::Chip8Error;

// The constants are specified by the CHIP-8 specification
pub const MEMORY_SIZE: usize = 4096;
pub const ROM_START_ADDRESS: usize = 0x200;
pub const FONT_START_ADDRESS: usize = 0x50;
pub const FONT_GLYPH_SIZE: usize = 5;
pub const FONT_END_ADDRESS: usize = FONT_START_ADDRESS + FONT.len();

/// Hex digit glyphs 0-F, 5 bytes each.
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// 4KB of bounds-checked RAM with the font seeded at 0x050.
pub struct Memory {
    cells: [u8; MEMORY_SIZE],
}

impl Memory {
    pub fn new() -> Self {
        let mut memory = Memory {
            cells: [0; MEMORY_SIZE],
        };
        memory.reset();
        memory
    }

    /// Zeroes every cell and rewrites the font table.
    pub fn reset(&mut self) {
        self.cells.fill(0);
        self.cells[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);
    }

    /// Copies a program image to 0x200.
    pub fn load_program(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let rom_end = ROM_START_ADDRESS + rom.len();
        self.cells
            .get_mut(ROM_START_ADDRESS..rom_end)
            .ok_or(Chip8Error::ProgramTooLarge {
                size: rom.len(),
                max_size: MEMORY_SIZE - ROM_START_ADDRESS,
            })?
            .copy_from_slice(rom);

        Ok(())
    }

    pub fn read(&self, address: usize) -> Result<u8, Chip8Error> {
        self.cells
            .get(address)
            .copied()
            .ok_or(Chip8Error::AddressOutOfRange { address })
    }

    /// Writes `bytes` starting at `address` on behalf of a running program.
    ///
    /// The interpreter area below 0x200 is read-only to programs. Nothing is
    /// written unless the whole range is writable.
    pub fn write(&mut self, address: usize, bytes: &[u8]) -> Result<(), Chip8Error> {
        if address < ROM_START_ADDRESS {
            return Err(Chip8Error::ReservedAddress { address });
        }

        let end = address + bytes.len();
        self.cells
            .get_mut(address..end)
            .ok_or(Chip8Error::AddressOutOfRange {
                address: address.max(MEMORY_SIZE),
            })?
            .copy_from_slice(bytes);

        Ok(())
    }

    /// Reads `len` consecutive bytes starting at `address`.
    pub fn slice(&self, address: usize, len: usize) -> Result<&[u8], Chip8Error> {
        let end = address + len;
        self.cells
            .get(address..end)
            .ok_or(Chip8Error::AddressOutOfRange {
                address: address.max(MEMORY_SIZE),
            })
    }

    pub fn as_bytes(&self) -> &[u8; MEMORY_SIZE] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// Address of the 5-byte glyph for `digit`.
pub fn font_glyph_address(digit: u8) -> usize {
    FONT_START_ADDRESS + digit as usize * FONT_GLYPH_SIZE
}
