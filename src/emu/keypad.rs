use crate::u4;

/// State of the 16-key hex keypad.
///
/// Alongside the live held state, every released-to-held transition is
/// latched so a key wait can observe presses that happen between ticks.
#[derive(Debug, Clone, Default)]
pub struct Keypad {
    held: [bool; 16],
    presses: u16,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, key: u4, pressed: bool) {
        if pressed && !self.held[key] {
            self.presses |= 1 << key.get();
        }
        self.held[key] = pressed;
    }

    pub fn is_pressed(&self, key: u4) -> bool {
        self.held[key]
    }

    pub fn keys(&self) -> &[bool; 16] {
        &self.held
    }

    /// Forgets every latched press.
    pub fn clear_presses(&mut self) {
        self.presses = 0;
    }

    /// Takes the lowest-numbered latched press, if any.
    pub fn take_press(&mut self) -> Option<u4> {
        if self.presses == 0 {
            return None;
        }

        let key = self.presses.trailing_zeros() as u8;
        self.presses &= !(1 << key);
        Some(u4::new(key))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
