use std::time::Duration;

use super::{Chip8, Chip8Error, Chip8Result, Display, TIMER_HZ};
use crate::u4;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// High-level emulator runner that manages timing internally.
///
/// The instruction clock and the 60Hz timer clock are independent: each has
/// its own accumulator, and a suspended instruction clock (key wait or
/// fault) never holds back the timers.
pub struct Chip8Runner {
    chip8: Chip8,
    cpu_step_nanos: u64,
    timer_step_nanos: u64,
    cpu_accumulator: u64,
    timer_accumulator: u64,
}

/// What happened during one `update`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub instructions: u32,
    pub timer_ticks: u32,
    pub display_changed: bool,
    pub waiting_for_key: bool,
}

impl Chip8Runner {
    pub fn new(chip8: Chip8) -> Self {
        let cpu_hz = u64::from(chip8.config().cpu_hz.max(1));

        Self {
            chip8,
            // Rates above 1GHz run one instruction per nanosecond
            cpu_step_nanos: (NANOS_PER_SEC / cpu_hz).max(1),
            timer_step_nanos: NANOS_PER_SEC / u64::from(TIMER_HZ),
            cpu_accumulator: 0,
            timer_accumulator: 0,
        }
    }

    /// Runs exactly one instruction cycle.
    pub fn tick_instruction(&mut self) -> Result<Chip8Result, Chip8Error> {
        self.chip8.cpu_cycle()
    }

    /// Runs exactly one 60Hz timer tick.
    pub fn tick_timer(&mut self) {
        self.chip8.timers_cycle();
    }

    /// Update emulator by delta time, handles both CPU and timer cycles.
    ///
    /// Time advances in slices of at most one timer period, so timer ticks and
    /// instructions interleave the way they would in real time. Timer ticks are
    /// always applied in full, even when the CPU faults or waits for a key.
    pub fn update(&mut self, dt: Duration) -> Result<UpdateSummary, Chip8Error> {
        let mut remaining = u64::try_from(dt.as_nanos()).unwrap_or(u64::MAX);
        let mut summary = UpdateSummary::default();
        let mut fault = None;

        while remaining > 0 {
            let slice = remaining.min(self.timer_step_nanos);
            remaining -= slice;

            // The accumulator stays below one period, so a slice holds at most one tick
            self.timer_accumulator += slice;
            if self.timer_accumulator >= self.timer_step_nanos {
                self.timer_accumulator -= self.timer_step_nanos;
                self.tick_timer();
                summary.timer_ticks += 1;
            }

            if fault.is_none() {
                self.cpu_accumulator = self.cpu_accumulator.saturating_add(slice);
                if let Err(err) = self.run_due_instructions(&mut summary) {
                    self.cpu_accumulator = 0;
                    fault = Some(err);
                }
            }
        }

        match fault {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    fn run_due_instructions(&mut self, summary: &mut UpdateSummary) -> Result<(), Chip8Error> {
        while self.cpu_accumulator >= self.cpu_step_nanos {
            self.cpu_accumulator -= self.cpu_step_nanos;

            match self.tick_instruction()? {
                Chip8Result::Continue => {}
                Chip8Result::DisplayChanged => summary.display_changed = true,
                Chip8Result::WaitingForKey => {
                    // Nothing to do until the next key event.
                    // We clear the accumulator to avoid "catching up" once a key arrives.
                    self.cpu_accumulator = 0;
                    summary.waiting_for_key = true;
                    return Ok(());
                }
            }
            summary.instructions += 1;
        }

        Ok(())
    }

    /// Stops time, resets the VM and loads a new program.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        self.chip8.load(rom)?;
        self.cpu_accumulator = 0;
        self.timer_accumulator = 0;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.chip8.reset();
        self.cpu_accumulator = 0;
        self.timer_accumulator = 0;
    }

    /// Returns true if the sound timer is active, indicating a beep should be played.
    pub fn is_sound_active(&self) -> bool {
        self.chip8.is_sound_active()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.chip8.set_key(key, pressed)
    }

    pub fn display(&self) -> &Display<bool> {
        self.chip8.display()
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn get_display_pixel(&self, y: usize, x: usize) -> bool {
        self.chip8.get_display_pixel(y, x)
    }

    pub fn chip8_ref(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::Chip8Config;

    fn runner(words: &[u16], cpu_hz: u32) -> Chip8Runner {
        let rom: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        let mut chip8 = Chip8::with_config(Chip8Config {
            cpu_hz,
            ..Chip8Config::default()
        });
        chip8.load(&rom).unwrap();
        Chip8Runner::new(chip8)
    }

    #[test]
    fn one_second_is_sixty_timer_ticks_at_any_cpu_rate() {
        for cpu_hz in [1, 60, 700, 1000] {
            // LD V0, 60; LD DT, V0; JP 0x204
            let mut runner = runner(&[0x603C, 0xF015, 0x1204], cpu_hz);
            runner.tick_instruction().unwrap();
            runner.tick_instruction().unwrap();
            assert_eq!(runner.chip8_ref().delay_timer(), 60);

            let summary = runner.update(Duration::from_secs(1)).unwrap();
            assert_eq!(summary.timer_ticks, 60);
            assert_eq!(summary.instructions, cpu_hz);
            assert_eq!(runner.chip8_ref().delay_timer(), 0);
        }
    }

    #[test]
    fn instructions_see_the_delay_timer_count_down() {
        // LD V0, 60; LD DT, V0
        // 0x204: LD V1, DT; SNE V1, 30; ADD V2, 1; JP 0x204
        let mut runner = runner(&[0x603C, 0xF015, 0xF107, 0x411E, 0x7201, 0x1204], 700);
        runner.tick_instruction().unwrap();
        runner.tick_instruction().unwrap();

        runner.update(Duration::from_secs(1)).unwrap();
        assert_eq!(runner.chip8_ref().delay_timer(), 0);
        let seen_at_thirty = runner.chip8_ref().v()[2];
        assert!((1..10).contains(&seen_at_thirty), "{seen_at_thirty}");
    }

    #[test]
    fn rates_above_one_gigahertz_still_return() {
        let mut runner = runner(&[0x1200], 2_000_000_000);
        let summary = runner.update(Duration::from_micros(10)).unwrap();
        assert_eq!(summary.instructions, 10_000);
        assert_eq!(summary.timer_ticks, 0);
    }

    #[test]
    fn small_steps_accumulate() {
        let mut runner = runner(&[0x1200], 700);
        let mut ticks = 0;
        let mut instructions = 0;
        for _ in 0..1000 {
            let summary = runner.update(Duration::from_millis(1)).unwrap();
            ticks += summary.timer_ticks;
            instructions += summary.instructions;
        }
        assert_eq!(ticks, 60);
        assert_eq!(instructions, 700);
    }

    #[test]
    fn key_wait_does_not_stall_timers() {
        // LD V0, 60; LD ST, V0; LD V1, K
        let mut runner = runner(&[0x603C, 0xF018, 0xF10A], 700);
        let first = runner.update(Duration::from_millis(100)).unwrap();
        assert!(first.waiting_for_key);
        assert_eq!(runner.chip8_ref().pc(), 0x206);

        for _ in 0..10 {
            let summary = runner.update(Duration::from_millis(100)).unwrap();
            assert!(summary.waiting_for_key);
            assert_eq!(runner.chip8_ref().pc(), 0x206);
        }

        assert_eq!(runner.chip8_ref().sound_timer(), 0);
        assert!(!runner.is_sound_active());

        runner.set_key(u4::new(0xE), true);
        runner.update(Duration::from_millis(2)).unwrap();
        assert_eq!(runner.chip8_ref().v()[1], 0xE);
    }

    #[test]
    fn fault_is_reported_and_timers_still_run() {
        let mut runner = runner(&[0x6005, 0xF015, 0x5121], 700);
        assert_eq!(
            runner.update(Duration::from_millis(10)),
            Err(Chip8Error::InvalidInstruction { opcode: 0x5121 })
        );
        assert_eq!(runner.update(Duration::from_millis(20)), Err(Chip8Error::Halted));
        assert!(runner.chip8_ref().delay_timer() < 5);

        runner.reset();
        assert!(runner.chip8_ref().fault().is_none());
    }
}
