use std::fmt;

// Header layout per gbdev.io/pandocs/The_Cartridge_Header.html.
const HEADER_END: usize = 0x150;
const TITLE_RANGE: std::ops::Range<usize> = 0x0134..0x0143;
const CART_TYPE_OFFSET: usize = 0x0147;
const RAM_SIZE_OFFSET: usize = 0x0149;

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    Mbc3,
    Mbc5,
}

/// Why a ROM image was rejected at load time. Construction is the only
/// fallible operation on a cartridge; reads and writes are total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    /// The image is too short to contain the 0x150-byte header area.
    TruncatedHeader { len: usize },
    /// The mapper byte at 0x0147 names hardware this core does not model.
    UnsupportedMapper { code: u8 },
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartridgeError::TruncatedHeader { len } => {
                write!(f, "ROM image is {len} bytes, too short for a cartridge header")
            }
            CartridgeError::UnsupportedMapper { code } => {
                write!(f, "unsupported cartridge type 0x{code:02X}")
            }
        }
    }
}

impl std::error::Error for CartridgeError {}

#[derive(Debug)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub mbc: MbcType,
    pub title: String,
    mbc_state: MbcState,
}

#[derive(Debug)]
enum MbcState {
    NoMbc,
    Mbc1 {
        rom_bank: u8,
        ram_bank: u8,
        mode: u8,
        ram_enable: bool,
    },
    Mbc3 {
        rom_bank: u8,
        ram_bank: u8,
        ram_enable: bool,
    },
    Mbc5 {
        rom_bank: u16,
        ram_bank: u8,
        ram_enable: bool,
    },
}

impl Cartridge {
    /// Parse the header and construct a cartridge. The mapper is inferred
    /// from the type byte at 0x0147; images with a truncated header or an
    /// unmodeled mapper are rejected rather than run with undefined banking.
    pub fn load(data: Vec<u8>) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::TruncatedHeader { len: data.len() });
        }

        let cart_type = data[CART_TYPE_OFFSET];
        let mbc = match cart_type {
            0x00 | 0x08 | 0x09 => MbcType::NoMbc,
            0x01..=0x03 => MbcType::Mbc1,
            0x0F..=0x13 => MbcType::Mbc3,
            0x19..=0x1E => MbcType::Mbc5,
            code => return Err(CartridgeError::UnsupportedMapper { code }),
        };

        let ram_size = match data[RAM_SIZE_OFFSET] {
            0x00 => 0,
            0x01 => 0x800,
            0x02 => 0x2000,
            0x03 => 0x8000,
            0x04 => 0x20000,
            0x05 => 0x10000,
            _ => RAM_BANK_SIZE,
        };

        let title_bytes = &data[TITLE_RANGE];
        let end = title_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(title_bytes.len());
        let title = String::from_utf8_lossy(&title_bytes[..end]).trim().to_string();

        let mbc_state = match mbc {
            MbcType::NoMbc => MbcState::NoMbc,
            MbcType::Mbc1 => MbcState::Mbc1 {
                rom_bank: 1,
                ram_bank: 0,
                mode: 0,
                ram_enable: false,
            },
            MbcType::Mbc3 => MbcState::Mbc3 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
            },
            MbcType::Mbc5 => MbcState::Mbc5 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
            },
        };

        log::debug!("loaded cartridge {title:?} (type 0x{cart_type:02X}, {mbc:?})");

        Ok(Self {
            rom: data,
            ram: vec![0; ram_size],
            mbc,
            title,
            mbc_state,
        })
    }

    pub fn read(&self, addr: u16) -> u8 {
        let rom_bank_count = (self.rom.len() / ROM_BANK_SIZE).max(1);
        match (&self.mbc_state, addr) {
            (MbcState::NoMbc, 0x0000..=0x7FFF) => {
                self.rom.get(addr as usize).copied().unwrap_or(0xFF)
            }
            (MbcState::Mbc1 { ram_bank, mode, .. }, 0x0000..=0x3FFF) => {
                // In mode 1 the upper bank bits also steer the fixed window.
                let bank = if *mode == 0 {
                    0
                } else {
                    (((*ram_bank as usize) & 0x03) << 5) % rom_bank_count
                };
                let offset = bank * ROM_BANK_SIZE + addr as usize;
                self.rom.get(offset).copied().unwrap_or(0xFF)
            }
            (
                MbcState::Mbc1 {
                    rom_bank, ram_bank, ..
                },
                0x4000..=0x7FFF,
            ) => {
                let mut bank = (((*ram_bank as usize) & 0x03) << 5) | (*rom_bank as usize & 0x1F);
                if bank & 0x1F == 0 {
                    bank += 1;
                }
                bank %= rom_bank_count;
                let offset = bank * ROM_BANK_SIZE + (addr as usize - 0x4000);
                self.rom.get(offset).copied().unwrap_or(0xFF)
            }
            (MbcState::Mbc3 { .. }, 0x0000..=0x3FFF)
            | (MbcState::Mbc5 { .. }, 0x0000..=0x3FFF) => {
                self.rom.get(addr as usize).copied().unwrap_or(0xFF)
            }
            (MbcState::Mbc3 { rom_bank, .. }, 0x4000..=0x7FFF) => {
                let bank = (if *rom_bank == 0 { 1 } else { *rom_bank } as usize) % rom_bank_count;
                let offset = bank * ROM_BANK_SIZE + (addr as usize - 0x4000);
                self.rom.get(offset).copied().unwrap_or(0xFF)
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x4000..=0x7FFF) => {
                let bank = (*rom_bank as usize) % rom_bank_count;
                let offset = bank * ROM_BANK_SIZE + (addr as usize - 0x4000);
                self.rom.get(offset).copied().unwrap_or(0xFF)
            }
            (MbcState::NoMbc, 0xA000..=0xBFFF) => {
                let idx = addr as usize - 0xA000;
                self.ram.get(idx).copied().unwrap_or(0xFF)
            }
            (MbcState::Mbc1 { ram_enable, .. }, 0xA000..=0xBFFF)
            | (MbcState::Mbc3 { ram_enable, .. }, 0xA000..=0xBFFF)
            | (MbcState::Mbc5 { ram_enable, .. }, 0xA000..=0xBFFF) => {
                if !*ram_enable {
                    0xFF
                } else {
                    self.ram.get(self.ram_index(addr)).copied().unwrap_or(0xFF)
                }
            }
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match (&mut self.mbc_state, addr) {
            (MbcState::NoMbc, 0xA000..=0xBFFF) => {
                let idx = addr as usize - 0xA000;
                if let Some(b) = self.ram.get_mut(idx) {
                    *b = val;
                }
            }
            // ROM-only: writes to the ROM window are silently ignored.
            (MbcState::NoMbc, _) => {}
            (MbcState::Mbc1 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (MbcState::Mbc1 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = val & 0x1F;
                if *rom_bank == 0 {
                    *rom_bank = 1;
                }
            }
            (MbcState::Mbc1 { ram_bank, .. }, 0x4000..=0x5FFF) => {
                *ram_bank = val & 0x03;
            }
            (MbcState::Mbc1 { mode, .. }, 0x6000..=0x7FFF) => {
                *mode = val & 0x01;
            }
            (MbcState::Mbc1 { ram_enable, .. }, 0xA000..=0xBFFF) => {
                if *ram_enable {
                    let idx = self.ram_index(addr);
                    if let Some(b) = self.ram.get_mut(idx) {
                        *b = val;
                    }
                }
            }
            (MbcState::Mbc3 { ram_enable, .. }, 0x0000..=0x1FFF)
            | (MbcState::Mbc5 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (MbcState::Mbc3 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = val & 0x7F;
                if *rom_bank == 0 {
                    *rom_bank = 1;
                }
            }
            (MbcState::Mbc3 { ram_bank, .. }, 0x4000..=0x5FFF) => {
                *ram_bank = val & 0x03;
            }
            (MbcState::Mbc3 { .. }, 0x6000..=0x7FFF) => {
                // RTC latch on real MBC3 hardware; no clock is modeled.
            }
            (MbcState::Mbc3 { ram_enable, .. }, 0xA000..=0xBFFF) => {
                if *ram_enable {
                    let idx = self.ram_index(addr);
                    if let Some(b) = self.ram.get_mut(idx) {
                        *b = val;
                    }
                }
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x2000..=0x2FFF) => {
                *rom_bank = (*rom_bank & 0x100) | val as u16;
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x3000..=0x3FFF) => {
                *rom_bank = (*rom_bank & 0xFF) | (((val & 0x01) as u16) << 8);
            }
            (MbcState::Mbc5 { ram_bank, .. }, 0x4000..=0x5FFF) => {
                *ram_bank = val & 0x0F;
            }
            (MbcState::Mbc5 { ram_enable, .. }, 0xA000..=0xBFFF) => {
                if *ram_enable {
                    let idx = self.ram_index(addr);
                    if let Some(b) = self.ram.get_mut(idx) {
                        *b = val;
                    }
                }
            }
            _ => {}
        }
    }

    fn ram_index(&self, addr: u16) -> usize {
        let ram_bank_count = if self.ram.is_empty() {
            0
        } else {
            self.ram.len().div_ceil(RAM_BANK_SIZE)
        };
        let bank = match &self.mbc_state {
            MbcState::NoMbc => 0,
            MbcState::Mbc1 { ram_bank, mode, .. } => {
                if *mode == 0 {
                    0
                } else {
                    *ram_bank as usize
                }
            }
            MbcState::Mbc3 { ram_bank, .. } => *ram_bank as usize,
            MbcState::Mbc5 { ram_bank, .. } => *ram_bank as usize,
        };
        let bank = if ram_bank_count == 0 {
            0
        } else {
            bank % ram_bank_count
        };
        bank * RAM_BANK_SIZE + (addr as usize - 0xA000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with_type(cart_type: u8, banks: usize) -> Vec<u8> {
        let mut rom = vec![0u8; banks * ROM_BANK_SIZE];
        rom[CART_TYPE_OFFSET] = cart_type;
        rom
    }

    #[test]
    fn truncated_rom_is_rejected() {
        let err = Cartridge::load(vec![0; 0x100]).unwrap_err();
        assert_eq!(err, CartridgeError::TruncatedHeader { len: 0x100 });
    }

    #[test]
    fn unknown_mapper_is_rejected() {
        let err = Cartridge::load(rom_with_type(0xFC, 2)).unwrap_err();
        assert_eq!(err, CartridgeError::UnsupportedMapper { code: 0xFC });
    }

    #[test]
    fn title_is_trimmed_at_nul() {
        let mut rom = rom_with_type(0x00, 2);
        rom[0x0134..0x0139].copy_from_slice(b"TETRA");
        let cart = Cartridge::load(rom).unwrap();
        assert_eq!(cart.title, "TETRA");
    }

    #[test]
    fn mbc5_nine_bit_bank_select() {
        let mut rom = rom_with_type(0x19, 512);
        for bank in 0..512 {
            rom[bank * ROM_BANK_SIZE] = (bank % 251) as u8;
        }
        let mut cart = Cartridge::load(rom).unwrap();
        cart.write(0x2000, 0x00);
        cart.write(0x3000, 0x01); // bank 0x100
        assert_eq!(cart.read(0x4000), (0x100 % 251) as u8);
    }

    #[test]
    fn bank_index_wraps_to_available_banks() {
        let mut rom = rom_with_type(0x19, 4);
        for bank in 0..4 {
            rom[bank * ROM_BANK_SIZE] = bank as u8;
        }
        let mut cart = Cartridge::load(rom).unwrap();
        cart.write(0x2000, 0x06); // modulo 4 => bank 2
        assert_eq!(cart.read(0x4000), 2);
    }
}
