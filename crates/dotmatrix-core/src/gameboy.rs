use crate::{
    cartridge::{Cartridge, CartridgeError},
    cpu::{Cpu, Registers},
    input::Button,
    mmu::Mmu,
    ppu::FRAME_BYTES,
};

/// The whole console: CPU, bus and peripherals behind a host-facing API.
///
/// The host drives emulation with [`step`](Self::step) or
/// [`run_until_frame`](Self::run_until_frame), presents
/// [`frame`](Self::frame) once [`frame_ready`](Self::frame_ready) reports
/// true, and acknowledges with [`end_frame`](Self::end_frame). The ready flag
/// stays set until acknowledged, so a slow host never misses or tears a
/// frame.
pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    paused: bool,
    pause_requested: bool,
}

impl GameBoy {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(),
            paused: false,
            pause_requested: false,
        }
    }

    /// Create a console with the given ROM image loaded.
    pub fn with_rom(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        let cart = Cartridge::load(rom)?;
        let mut gb = Self::new();
        gb.mmu.load_cart(cart);
        Ok(gb)
    }

    /// Reset to the initial power-on state while preserving the loaded
    /// cartridge.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        self.cpu = Cpu::new();
        self.mmu = Mmu::new();
        self.paused = false;
        self.pause_requested = false;
        if let Some(c) = cart {
            self.mmu.load_cart(c);
        }
    }

    /// Execute one CPU instruction (with all the peripherals advancing in
    /// lockstep) and return the T-cycles it consumed. Returns 0 while paused.
    pub fn step(&mut self) -> u32 {
        if self.paused {
            return 0;
        }
        let cycles = self.cpu.step(&mut self.mmu);
        if self.pause_requested && self.mmu.ppu.frame_ready() {
            self.paused = true;
        }
        cycles
    }

    /// Run until a frame is ready (or immediately if one is already pending
    /// acknowledgment, or if paused).
    pub fn run_until_frame(&mut self) {
        while !self.paused && !self.mmu.ppu.frame_ready() {
            self.step();
        }
    }

    pub fn frame_ready(&self) -> bool {
        self.mmu.ppu.frame_ready()
    }

    /// The most recently completed frame, 160x144 row-major RGBA.
    pub fn frame(&self) -> &[u8; FRAME_BYTES] {
        self.mmu.ppu.frame()
    }

    /// Acknowledge the pending frame so emulation can publish the next one.
    pub fn end_frame(&mut self) {
        self.mmu.ppu.clear_frame_flag();
    }

    /// Number of frames completed since power-on.
    pub fn frames(&self) -> u64 {
        self.mmu.ppu.frames()
    }

    /// T-cycles elapsed since power-on.
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    pub fn registers(&self) -> Registers {
        self.cpu.registers()
    }

    /// Request a pause. Emulation keeps running until the frame in progress
    /// completes, so the display never stops on a partial frame.
    pub fn set_paused(&mut self, paused: bool) {
        if paused {
            self.pause_requested = true;
            if self.mmu.ppu.frame_ready() {
                self.paused = true;
            }
        } else {
            self.pause_requested = false;
            self.paused = false;
        }
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Press a button by host key id. Returns false for ids that do not map
    /// to a button.
    pub fn press_key(&mut self, id: u8) -> bool {
        match Button::from_id(id) {
            Some(button) => {
                self.press(button);
                true
            }
            None => {
                log::debug!("ignoring unmapped key id {}", id);
                false
            }
        }
    }

    /// Release a button by host key id. Returns false for unmapped ids.
    pub fn release_key(&mut self, id: u8) -> bool {
        match Button::from_id(id) {
            Some(button) => {
                self.release(button);
                true
            }
            None => false,
        }
    }

    /// Press a button. A high-to-low edge requests the joypad interrupt when
    /// the game has it enabled; holding a button does not re-trigger.
    pub fn press(&mut self, button: Button) {
        let edge = self.mmu.input.press(button);
        if edge && self.mmu.ie_reg & 0x10 != 0 {
            self.mmu.if_reg |= 0x10;
        }
    }

    pub fn release(&mut self, button: Button) {
        self.mmu.input.release(button);
    }

    /// Drain the bytes written to the serial port so far.
    pub fn serial_output(&mut self) -> Vec<u8> {
        self.mmu.take_serial()
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
