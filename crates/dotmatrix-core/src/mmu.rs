use crate::{cartridge::Cartridge, input::Input, ppu::Ppu, serial::Serial, timer::Timer};

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7F;

pub struct Mmu {
    pub wram: [u8; WRAM_SIZE],
    pub hram: [u8; HRAM_SIZE],
    pub cart: Option<Cartridge>,
    pub if_reg: u8,
    pub ie_reg: u8,
    pub serial: Serial,
    pub ppu: Ppu,
    pub timer: Timer,
    pub input: Input,
    /// Last value written to the OAM DMA register (0xFF46).
    dma: u8,
}

impl Mmu {
    pub fn new() -> Self {
        let mut timer = Timer::new();
        // Power-on DIV phase matching what the boot sequence leaves behind.
        timer.div = 0xABCC;

        Self {
            wram: [0; WRAM_SIZE],
            hram: [0; HRAM_SIZE],
            cart: None,
            if_reg: 0xE1,
            ie_reg: 0,
            serial: Serial::new(),
            ppu: Ppu::new(),
            timer,
            input: Input::new(),
            dma: 0,
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    pub fn take_serial(&mut self) -> Vec<u8> {
        self.serial.take_output()
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF),
            0x8000..=0x9FFF => {
                if self.ppu.vram_accessible() {
                    self.ppu.vram[(addr - 0x8000) as usize]
                } else {
                    0xFF
                }
            }
            0xA000..=0xBFFF => self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            // Echo RAM mirrors 0xC000-0xDDFF
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            0xFE00..=0xFE9F => {
                if self.ppu.oam_accessible() {
                    self.ppu.oam[(addr - 0xFE00) as usize]
                } else {
                    0xFF
                }
            }
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00 => self.input.read(),
            0xFF01 | 0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.if_reg | 0xE0,
            0xFF40..=0xFF45 | 0xFF47..=0xFF4B => self.ppu.read_reg(addr),
            0xFF46 => self.dma,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie_reg,
            _ => 0xFF,
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => {
                if self.ppu.vram_accessible() {
                    self.ppu.vram[(addr - 0x8000) as usize] = val;
                }
            }
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize] = val,
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize] = val,
            0xFE00..=0xFE9F => {
                if self.ppu.oam_accessible() {
                    self.ppu.oam[(addr - 0xFE00) as usize] = val;
                }
            }
            0xFEA0..=0xFEFF => {}
            0xFF00 => self.input.write(val),
            0xFF01 | 0xFF02 => self.serial.write(addr, val, &mut self.if_reg),
            0xFF04..=0xFF07 => self.timer.write(addr, val, &mut self.if_reg),
            0xFF0F => self.if_reg = val & 0x1F,
            0xFF40..=0xFF45 | 0xFF47..=0xFF4B => self.ppu.write_reg(addr, val),
            0xFF46 => {
                self.dma = val;
                self.oam_dma(val);
            }
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ie_reg = val,
            _ => {}
        }
    }

    /// OAM DMA: copy 160 bytes from `source << 8` into OAM. The DMA engine
    /// bypasses the mode-based access blocking that applies to the CPU.
    fn oam_dma(&mut self, source: u8) {
        let base = (source as u16) << 8;
        for i in 0..0xA0u16 {
            self.ppu.oam[i as usize] = self.dma_read(base.wrapping_add(i));
        }
    }

    fn dma_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF)
            }
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize],
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            _ => 0xFF,
        }
    }

    /// Advance the clocked peripherals by `m_cycles` machine cycles
    /// (4 T-cycles each).
    pub fn tick(&mut self, m_cycles: u32) {
        let hw_cycles = 4 * m_cycles as u16;
        self.timer.step(hw_cycles, &mut self.if_reg);
        self.ppu.step(hw_cycles as u32, &mut self.if_reg);
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}
