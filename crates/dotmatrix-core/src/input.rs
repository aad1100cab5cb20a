// Joypad register bits as documented in gbdev.io/pandocs/Joypad_Input.html.
// Button bits are active-low: 0 = pressed.

const SELECT_DPAD: u8 = 0x10;
const SELECT_ACTION: u8 = 0x20;

/// The eight console buttons.
///
/// The discriminants double as the stable key ids accepted by
/// [`crate::gameboy::GameBoy::press_key`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Right = 0,
    Left = 1,
    Up = 2,
    Down = 3,
    A = 4,
    B = 5,
    Select = 6,
    Start = 7,
}

impl Button {
    /// Map a host key id to a button. Ids outside 0..=7 are not recognized.
    pub fn from_id(id: u8) -> Option<Button> {
        match id {
            0 => Some(Button::Right),
            1 => Some(Button::Left),
            2 => Some(Button::Up),
            3 => Some(Button::Down),
            4 => Some(Button::A),
            5 => Some(Button::B),
            6 => Some(Button::Select),
            7 => Some(Button::Start),
            _ => None,
        }
    }

    fn is_action(self) -> bool {
        matches!(self, Button::A | Button::B | Button::Select | Button::Start)
    }

    fn mask(self) -> u8 {
        match self {
            Button::Right | Button::A => 0x01,
            Button::Left | Button::B => 0x02,
            Button::Up | Button::Select => 0x04,
            Button::Down | Button::Start => 0x08,
        }
    }
}

pub struct Input {
    /// D-pad nibble, active-low.
    dpad: u8,
    /// Action button nibble, active-low.
    action: u8,
    /// Select bits (4-5) last written by the CPU.
    select: u8,
}

impl Input {
    pub fn new() -> Self {
        Self {
            dpad: 0x0F,
            action: 0x0F,
            select: SELECT_DPAD | SELECT_ACTION,
        }
    }

    /// Read 0xFF00: the selected button nibble(s) under the select bits.
    /// Unselected groups read as released; unused high bits read back set.
    pub fn read(&self) -> u8 {
        let mut nibble = 0x0F;
        if self.select & SELECT_DPAD == 0 {
            nibble &= self.dpad;
        }
        if self.select & SELECT_ACTION == 0 {
            nibble &= self.action;
        }
        0xC0 | self.select | nibble
    }

    /// Write 0xFF00: only the two select bits are writable.
    pub fn write(&mut self, val: u8) {
        self.select = val & (SELECT_DPAD | SELECT_ACTION);
    }

    /// Latch a button press. Returns true if the button was previously
    /// released (the interrupt-worthy edge); repeated presses are no-ops.
    pub fn press(&mut self, button: Button) -> bool {
        let group = if button.is_action() {
            &mut self.action
        } else {
            &mut self.dpad
        };
        let was_released = *group & button.mask() != 0;
        *group &= !button.mask();
        was_released
    }

    /// Latch a button release. Idempotent.
    pub fn release(&mut self, button: Button) {
        if button.is_action() {
            self.action |= button.mask();
        } else {
            self.dpad |= button.mask();
        }
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unselected_groups_read_released() {
        let mut input = Input::new();
        input.press(Button::A);
        input.press(Button::Left);
        // Neither group selected: low nibble is all released.
        assert_eq!(input.read() & 0x0F, 0x0F);
    }

    #[test]
    fn select_bits_pick_the_group() {
        let mut input = Input::new();
        input.press(Button::A);
        input.press(Button::Left);

        // Select action buttons (bit 5 low).
        input.write(0x10);
        assert_eq!(input.read() & 0x0F, 0x0E);

        // Select d-pad (bit 4 low).
        input.write(0x20);
        assert_eq!(input.read() & 0x0F, 0x0D);
    }

    #[test]
    fn press_reports_edge_only_once() {
        let mut input = Input::new();
        assert!(input.press(Button::Start));
        assert!(!input.press(Button::Start));
        input.release(Button::Start);
        assert!(input.press(Button::Start));
    }
}
