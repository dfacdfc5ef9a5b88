use rand::Rng;

use super::{
    Chip8, Chip8Error, Chip8Result, Opcode, OpcodeALU, display, memory::font_glyph_address,
};
use crate::{u4, u12};

impl Chip8 {
    pub(crate) fn execute(&mut self, opcode: Opcode) -> Result<Chip8Result, Chip8Error> {
        self.pc = self.pc.wrapping_add(2);

        match opcode {
            Opcode::ClearDisplay => {
                display::clear(&mut self.display);
                return Ok(Chip8Result::DisplayChanged);
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn.into();
            }
            Opcode::JumpWithOffset { nnn } => {
                self.pc = nnn.wrapping_add(self.v[0].into()).into();
            }
            Opcode::Call { nnn } => {
                self.stack.push(self.pc)?;
                self.pc = nnn.into();
            }
            Opcode::Return => {
                self.pc = self.stack.pop()?;
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                if self.v[x] == nn {
                    self.skip();
                }
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                if self.v[x] != nn {
                    self.skip();
                }
            }
            Opcode::SkipRegEqualReg { x, y } => {
                if self.v[x] == self.v[y] {
                    self.skip();
                }
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                if self.v[x] != self.v[y] {
                    self.skip();
                }
            }
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Opcode::ALU { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = self.rng.random();
                self.v[x] = rand_byte & nn;
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn;
            }
            Opcode::AddIndexReg { x } => {
                self.i = self.i.wrapping_add(self.v[x].into());
            }
            Opcode::Draw { x, y, n } => {
                return self.execute_draw(x, y, n);
            }
            Opcode::SkipIfPressed { x } => {
                if self.keypad.is_pressed(u4::from_low(self.v[x])) {
                    self.skip();
                }
            }
            Opcode::SkipIfNotPressed { x } => {
                if !self.keypad.is_pressed(u4::from_low(self.v[x])) {
                    self.skip();
                }
            }
            Opcode::WaitForKey { x } => {
                // Only presses that start after this point count
                self.keypad.clear_presses();
                self.key_wait = Some(x);
                return Ok(Chip8Result::WaitingForKey);
            }
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.timers.delay;
            }
            Opcode::SetDelayTimer { x } => {
                self.timers.delay = self.v[x];
            }
            Opcode::SetSoundTimer { x } => {
                self.timers.sound = self.v[x];
            }
            Opcode::FontChar { x } => {
                self.i = u12::masked(font_glyph_address(self.v[x]) as u16);
            }
            Opcode::BCD { x } => {
                let value = self.v[x];
                let digits = [value / 100, (value / 10) % 10, value % 10];
                self.memory.write(usize::from(self.i), &digits)?;
            }
            Opcode::StoreRegs { x } => {
                let count = usize::from(x) + 1;
                self.memory.write(usize::from(self.i), &self.v[..count])?;
            }
            Opcode::LoadRegs { x } => {
                let count = usize::from(x) + 1;
                let bytes = self.memory.slice(usize::from(self.i), count)?;
                self.v[..count].copy_from_slice(bytes);
            }
            Opcode::Invalid(opcode) => {
                return Err(Chip8Error::InvalidInstruction { opcode });
            }
        };

        Ok(Chip8Result::Continue)
    }

    fn skip(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeALU) {
        // VF is written last so the flag wins when X is F
        match op {
            OpcodeALU::Set => self.v[x] = self.v[y],
            OpcodeALU::Or => self.v[x] |= self.v[y],
            OpcodeALU::And => self.v[x] &= self.v[y],
            OpcodeALU::Xor => self.v[x] ^= self.v[y],
            OpcodeALU::Add => {
                let sum = u16::from(self.v[x]) + u16::from(self.v[y]);
                self.v[x] = (sum & 0xFF) as u8;
                self.v[0xF] = u8::from(sum > 0xFF);
            }
            OpcodeALU::Sub => {
                let no_borrow = self.v[x] >= self.v[y];
                self.v[x] = self.v[x].wrapping_sub(self.v[y]);
                self.v[0xF] = u8::from(no_borrow);
            }
            OpcodeALU::SubReverse => {
                let no_borrow = self.v[y] >= self.v[x];
                self.v[x] = self.v[y].wrapping_sub(self.v[x]);
                self.v[0xF] = u8::from(no_borrow);
            }
            OpcodeALU::ShiftRight => {
                let lsb = self.v[x] & 1;
                self.v[x] >>= 1;
                self.v[0xF] = lsb;
            }
            OpcodeALU::ShiftLeft => {
                let msb = (self.v[x] >> 7) & 1;
                self.v[x] <<= 1;
                self.v[0xF] = msb;
            }
        }
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4) -> Result<Chip8Result, Chip8Error> {
        let sprite = self.memory.slice(usize::from(self.i), usize::from(n))?;
        let any_erased = display::draw_sprite(&mut self.display, self.v[x], self.v[y], sprite);

        self.v[0xF] = u8::from(any_erased);
        Ok(Chip8Result::DisplayChanged)
    }

    pub(crate) fn poll_key_wait(&mut self, x: u4) -> Chip8Result {
        match self.keypad.take_press() {
            Some(key) => {
                self.v[x] = key.get();
                self.key_wait = None;
                Chip8Result::Continue
            }
            None => Chip8Result::WaitingForKey,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::{Chip8Config, DISPLAY_X};

    fn seeded() -> Chip8 {
        Chip8::with_config(Chip8Config {
            rng_seed: Some(8),
            ..Chip8Config::default()
        })
    }

    fn exec(chip8: &mut Chip8, raw: u16) -> Result<Chip8Result, Chip8Error> {
        chip8.execute(Opcode::decode(raw))
    }

    fn program(words: &[u16]) -> Chip8 {
        let rom: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        let mut chip8 = seeded();
        chip8.load(&rom).unwrap();
        chip8
    }

    #[test]
    fn add_sets_carry_from_the_ninth_bit() {
        let mut chip8 = seeded();
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                chip8.v[1] = a;
                chip8.v[2] = b;
                exec(&mut chip8, 0x8124).unwrap();
                let sum = a as u16 + b as u16;
                assert_eq!(chip8.v[1], (sum % 256) as u8);
                assert_eq!(chip8.v[0xF], u8::from(sum > 255), "{a} + {b}");
            }
        }
    }

    #[test]
    fn subtraction_flags_no_borrow() {
        let mut chip8 = seeded();
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                chip8.v[1] = a;
                chip8.v[2] = b;
                exec(&mut chip8, 0x8125).unwrap();
                assert_eq!(chip8.v[1], a.wrapping_sub(b));
                assert_eq!(chip8.v[0xF], u8::from(a >= b));

                chip8.v[1] = a;
                chip8.v[2] = b;
                exec(&mut chip8, 0x8127).unwrap();
                assert_eq!(chip8.v[1], b.wrapping_sub(a));
                assert_eq!(chip8.v[0xF], u8::from(b >= a));
            }
        }
    }

    #[test]
    fn shifts_move_the_outgoing_bit_into_vf() {
        let mut chip8 = seeded();
        for a in 0..=255u8 {
            chip8.v[3] = a;
            chip8.v[4] = 0xAA;
            exec(&mut chip8, 0x8346).unwrap();
            assert_eq!(chip8.v[3], a >> 1);
            assert_eq!(chip8.v[0xF], a & 1);

            chip8.v[3] = a;
            exec(&mut chip8, 0x834E).unwrap();
            assert_eq!(chip8.v[3], a.wrapping_shl(1));
            assert_eq!(chip8.v[0xF], (a >> 7) & 1);
        }
    }

    #[test]
    fn flag_wins_when_vf_is_the_destination() {
        let mut chip8 = seeded();
        chip8.v[0xF] = 0xFF;
        chip8.v[1] = 1;
        exec(&mut chip8, 0x8F14).unwrap();
        assert_eq!(chip8.v[0xF], 1);
    }

    #[test]
    fn logic_ops_leave_vf_alone() {
        let mut chip8 = seeded();
        chip8.v[0xF] = 7;
        chip8.v[1] = 0b1100;
        chip8.v[2] = 0b1010;
        exec(&mut chip8, 0x8121).unwrap();
        assert_eq!(chip8.v[1], 0b1110);
        exec(&mut chip8, 0x8122).unwrap();
        assert_eq!(chip8.v[1], 0b1010);
        exec(&mut chip8, 0x8123).unwrap();
        assert_eq!(chip8.v[1], 0);
        exec(&mut chip8, 0x8120).unwrap();
        assert_eq!(chip8.v[1], 0b1010);
        assert_eq!(chip8.v[0xF], 7);
    }

    #[test]
    fn add_immediate_wraps_without_touching_vf() {
        let mut chip8 = seeded();
        chip8.v[5] = 0xF0;
        exec(&mut chip8, 0x7520).unwrap();
        assert_eq!(chip8.v[5], 0x10);
        assert_eq!(chip8.v[0xF], 0);
    }

    #[test]
    fn bcd_writes_three_digits() {
        let mut chip8 = seeded();
        chip8.i = u12::new(0x300);
        chip8.v[0] = 234;
        exec(&mut chip8, 0xF033).unwrap();
        assert_eq!(&chip8.memory()[0x300..0x303], &[2, 3, 4]);

        chip8.v[0] = 5;
        exec(&mut chip8, 0xF033).unwrap();
        assert_eq!(&chip8.memory()[0x300..0x303], &[0, 0, 5]);
    }

    #[test]
    fn bcd_past_end_of_memory_faults() {
        let mut chip8 = seeded();
        chip8.i = u12::new(0xFFE);
        assert_eq!(
            exec(&mut chip8, 0xF033),
            Err(Chip8Error::AddressOutOfRange { address: 0x1000 })
        );
    }

    #[test]
    fn store_and_load_registers_leave_index_in_place() {
        let mut chip8 = seeded();
        chip8.i = u12::new(0x400);
        chip8.v[..4].copy_from_slice(&[9, 8, 7, 6]);
        exec(&mut chip8, 0xF355).unwrap();
        assert_eq!(&chip8.memory()[0x400..0x405], &[9, 8, 7, 6, 0]);
        assert_eq!(chip8.i, u12::new(0x400));

        chip8.v = [0; 16];
        exec(&mut chip8, 0xF265).unwrap();
        assert_eq!(&chip8.v[..4], &[9, 8, 7, 0]);
        assert_eq!(chip8.i, u12::new(0x400));
    }

    #[test]
    fn store_registers_past_end_of_memory_faults() {
        let mut chip8 = seeded();
        chip8.i = u12::new(0xFFF);
        assert_eq!(
            exec(&mut chip8, 0xF155),
            Err(Chip8Error::AddressOutOfRange { address: 0x1000 })
        );
        assert_eq!(
            exec(&mut chip8, 0xF165),
            Err(Chip8Error::AddressOutOfRange { address: 0x1000 })
        );
    }

    #[test]
    fn faulting_register_transfer_changes_nothing() {
        let mut chip8 = seeded();
        chip8.i = u12::new(0xFFE);
        chip8.v[..3].copy_from_slice(&[0xAA, 0xBB, 0xCC]);
        assert_eq!(
            exec(&mut chip8, 0xF255),
            Err(Chip8Error::AddressOutOfRange { address: 0x1000 })
        );
        assert_eq!(&chip8.memory()[0xFFE..], &[0, 0]);

        chip8.v[0] = 123;
        assert!(exec(&mut chip8, 0xF033).is_err());
        assert_eq!(&chip8.memory()[0xFFE..], &[0, 0]);

        assert!(exec(&mut chip8, 0xF265).is_err());
        assert_eq!(&chip8.v[..3], &[123, 0xBB, 0xCC]);
    }

    #[test]
    fn store_registers_into_font_area_is_rejected() {
        let mut chip8 = seeded();
        chip8.i = u12::new(0x50);
        assert_eq!(
            exec(&mut chip8, 0xF055),
            Err(Chip8Error::ReservedAddress { address: 0x50 })
        );
    }

    #[test]
    fn index_arithmetic_wraps_to_twelve_bits() {
        let mut chip8 = seeded();
        chip8.i = u12::new(0xFFE);
        chip8.v[1] = 5;
        exec(&mut chip8, 0xF11E).unwrap();
        assert_eq!(chip8.i, u12::new(0x003));

        chip8.v[0] = 0x10;
        exec(&mut chip8, 0xBFF8).unwrap();
        assert_eq!(chip8.pc, 0x008);
    }

    #[test]
    fn font_char_points_at_glyph() {
        let mut chip8 = seeded();
        chip8.v[2] = 0xA;
        exec(&mut chip8, 0xF229).unwrap();
        assert_eq!(chip8.i, u12::new(0x50 + 0xA * 5));
        exec(&mut chip8, 0xA123).unwrap();
        assert_eq!(chip8.i, u12::new(0x123));
    }

    #[test]
    fn skips_compare_registers_and_immediates() {
        let cases = [
            (0x3142, 0x42, 0x00, true),
            (0x3142, 0x41, 0x00, false),
            (0x4142, 0x41, 0x00, true),
            (0x4142, 0x42, 0x00, false),
            (0x5120, 0x07, 0x07, true),
            (0x5120, 0x07, 0x08, false),
            (0x9120, 0x07, 0x08, true),
            (0x9120, 0x07, 0x07, false),
        ];

        for (raw, v1, v2, skipped) in cases {
            let mut chip8 = seeded();
            chip8.v[1] = v1;
            chip8.v[2] = v2;
            exec(&mut chip8, raw).unwrap();
            let expected = if skipped { 0x204 } else { 0x202 };
            assert_eq!(chip8.pc, expected, "{raw:04X} V1={v1} V2={v2}");
        }
    }

    #[test]
    fn key_skips_use_live_state() {
        let mut chip8 = seeded();
        chip8.v[0] = 0xB;
        exec(&mut chip8, 0xE09E).unwrap();
        assert_eq!(chip8.pc, 0x202);
        exec(&mut chip8, 0xE0A1).unwrap();
        assert_eq!(chip8.pc, 0x206);

        chip8.set_key(u4::new(0xB), true);
        exec(&mut chip8, 0xE09E).unwrap();
        assert_eq!(chip8.pc, 0x20A);
        exec(&mut chip8, 0xE0A1).unwrap();
        assert_eq!(chip8.pc, 0x20C);
    }

    #[test]
    fn random_is_masked_and_seeded() {
        let mut a = seeded();
        let mut b = seeded();
        for _ in 0..32 {
            exec(&mut a, 0xC30F).unwrap();
            exec(&mut b, 0xC30F).unwrap();
            assert_eq!(a.v[3] & 0xF0, 0);
            assert_eq!(a.v[3], b.v[3]);
        }
        exec(&mut a, 0xC300).unwrap();
        assert_eq!(a.v[3], 0);
    }

    #[test]
    fn timers_are_read_and_written() {
        let mut chip8 = seeded();
        chip8.v[4] = 30;
        exec(&mut chip8, 0xF415).unwrap();
        exec(&mut chip8, 0xF418).unwrap();
        assert_eq!(chip8.delay_timer(), 30);
        assert!(chip8.is_sound_active());

        chip8.timers_cycle();
        exec(&mut chip8, 0xF507).unwrap();
        assert_eq!(chip8.v[5], 29);
    }

    #[test]
    fn call_then_return_resumes_after_the_call() {
        // 0x200: CALL 0x206, 0x202: LD V0, 1, 0x204: JP 0x204, 0x206: RET
        let mut chip8 = program(&[0x2206, 0x6001, 0x1204, 0x00EE]);
        chip8.cpu_cycle().unwrap();
        assert_eq!(chip8.pc(), 0x206);
        assert_eq!(chip8.stack(), &[0x202]);

        chip8.cpu_cycle().unwrap();
        assert_eq!(chip8.pc(), 0x202);
        assert!(chip8.stack().is_empty());

        chip8.cpu_cycle().unwrap();
        assert_eq!(chip8.v()[0], 1);
    }

    #[test]
    fn recursion_past_sixteen_frames_overflows() {
        let mut chip8 = program(&[0x2200]);
        for _ in 0..16 {
            chip8.cpu_cycle().unwrap();
        }
        assert_eq!(
            chip8.cpu_cycle(),
            Err(Chip8Error::StackOverflow { depth: 16 })
        );
    }

    #[test]
    fn return_on_empty_stack_underflows() {
        let mut chip8 = program(&[0x00EE]);
        assert_eq!(chip8.cpu_cycle(), Err(Chip8Error::StackUnderflow));
    }

    #[test]
    fn draw_reports_collision_and_clear_blanks() {
        // I = glyph 0, draw at (V0, V1) twice
        let mut chip8 = program(&[0xA050, 0xD015, 0xD015, 0x00E0]);
        chip8.cpu_cycle().unwrap();

        assert_eq!(chip8.cpu_cycle(), Ok(Chip8Result::DisplayChanged));
        assert_eq!(chip8.v()[0xF], 0);
        assert!(chip8.get_display_pixel(0, 0));

        chip8.cpu_cycle().unwrap();
        assert_eq!(chip8.v()[0xF], 1);
        assert!(chip8.display().iter().flatten().all(|p| !*p));

        chip8.display[3][DISPLAY_X - 1] = true;
        assert_eq!(chip8.cpu_cycle(), Ok(Chip8Result::DisplayChanged));
        assert!(!chip8.get_display_pixel(3, DISPLAY_X - 1));
    }

    #[test]
    fn wait_for_key_holds_pc_while_timers_run() {
        // 0x200: LD V2, K, 0x202: LD V3, 7
        let mut chip8 = program(&[0xF20A, 0x6307]);
        chip8.timers.delay = 60;

        assert_eq!(chip8.cpu_cycle(), Ok(Chip8Result::WaitingForKey));
        for _ in 0..30 {
            assert_eq!(chip8.cpu_cycle(), Ok(Chip8Result::WaitingForKey));
            chip8.timers_cycle();
            assert_eq!(chip8.pc(), 0x202);
        }
        assert_eq!(chip8.delay_timer(), 30);
        assert_eq!(chip8.v()[3], 0);

        chip8.set_key(u4::new(0x9), true);
        assert_eq!(chip8.cpu_cycle(), Ok(Chip8Result::Continue));
        assert_eq!(chip8.v()[2], 0x9);
        assert!(!chip8.is_waiting_for_key());

        chip8.cpu_cycle().unwrap();
        assert_eq!(chip8.v()[3], 7);
    }

    #[test]
    fn wait_for_key_ignores_keys_already_held() {
        let mut chip8 = program(&[0xF00A]);
        chip8.set_key(u4::new(0x4), true);

        chip8.cpu_cycle().unwrap();
        assert_eq!(chip8.cpu_cycle(), Ok(Chip8Result::WaitingForKey));

        chip8.set_key(u4::new(0x4), false);
        assert_eq!(chip8.cpu_cycle(), Ok(Chip8Result::WaitingForKey));
        chip8.set_key(u4::new(0x4), true);
        assert_eq!(chip8.cpu_cycle(), Ok(Chip8Result::Continue));
        assert_eq!(chip8.v()[0], 0x4);
    }
}
