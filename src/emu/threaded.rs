use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{error, info};

use super::{Chip8, Chip8Error, Display, TIMER_HZ};
use crate::u4;

/// Runs the instruction clock and the 60Hz timer clock on two threads.
///
/// Both threads share one VM behind a single mutex, so every instruction,
/// timer tick and key event is applied atomically. Loading or resetting
/// stops both clocks first; call `start` to resume.
pub struct ThreadedRunner {
    chip8: Arc<Mutex<Chip8>>,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl ThreadedRunner {
    pub fn new(chip8: Chip8) -> Self {
        Self {
            chip8: Arc::new(Mutex::new(chip8)),
            running: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
        }
    }

    /// Spawns both clocks. Does nothing if they are already running.
    pub fn start(&mut self) {
        if !self.threads.is_empty() {
            return;
        }

        let cpu_hz = lock(&self.chip8).config().cpu_hz.max(1);
        self.running.store(true, Ordering::Release);

        let chip8 = Arc::clone(&self.chip8);
        let running = Arc::clone(&self.running);
        self.threads.push(thread::spawn(move || {
            run_periodic(&running, cpu_hz, || {
                let result = lock(&chip8).cpu_cycle();
                if let Err(err) = &result {
                    error!("Instruction clock stopped: {err}");
                }
                result.is_ok()
            })
        }));

        let chip8 = Arc::clone(&self.chip8);
        let running = Arc::clone(&self.running);
        self.threads.push(thread::spawn(move || {
            run_periodic(&running, TIMER_HZ, || {
                lock(&chip8).timers_cycle();
                true
            })
        }));

        info!("Started clocks: cpu {cpu_hz}Hz, timers {TIMER_HZ}Hz");
    }

    /// Stops both clocks and waits for their threads to exit.
    pub fn stop(&mut self) {
        if self.threads.is_empty() {
            return;
        }

        self.running.store(false, Ordering::Release);
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                error!("Clock thread panicked");
            }
        }

        info!("Stopped clocks");
    }

    /// True while both clocks are alive. The instruction clock exits on its
    /// own after a fault, the timer clock keeps going until `stop`.
    pub fn is_running(&self) -> bool {
        !self.threads.is_empty() && self.threads.iter().all(|handle| !handle.is_finished())
    }

    /// Stops the clocks, resets the VM and loads a new program.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        self.stop();
        lock(&self.chip8).load(rom)
    }

    /// Stops the clocks and resets the VM.
    pub fn reset(&mut self) {
        self.stop();
        lock(&self.chip8).reset();
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&self, key: u4, pressed: bool) {
        lock(&self.chip8).set_key(key, pressed);
    }

    /// Copy of the current framebuffer.
    pub fn display(&self) -> Display<bool> {
        *lock(&self.chip8).display()
    }

    pub fn is_sound_active(&self) -> bool {
        lock(&self.chip8).is_sound_active()
    }

    /// The fault that stopped the instruction clock, if any.
    pub fn fault(&self) -> Option<Chip8Error> {
        lock(&self.chip8).fault().cloned()
    }

    /// Runs `f` with the VM locked.
    pub fn with_chip8<R>(&self, f: impl FnOnce(&mut Chip8) -> R) -> R {
        f(&mut lock(&self.chip8))
    }
}

impl Drop for ThreadedRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

// Poisoning is ignored, the VM state stays readable.
fn lock(chip8: &Mutex<Chip8>) -> MutexGuard<'_, Chip8> {
    chip8.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Calls `tick` `hz` times per second until `running` is cleared or `tick`
/// returns false.
fn run_periodic(running: &AtomicBool, hz: u32, mut tick: impl FnMut() -> bool) {
    let period = Duration::from_secs(1) / hz;
    let mut next = Instant::now();

    while running.load(Ordering::Acquire) {
        if !tick() {
            return;
        }

        next += period;
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        } else if now - next > period * 4 {
            // Fell far behind, resume at the usual rate without a burst.
            next = now;
        }
    }
}
