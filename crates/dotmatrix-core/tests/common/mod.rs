#![allow(dead_code)]

/// Build a 32 KiB ROM-only cartridge image with `program` placed at the
/// entry point (0x0100).
pub fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x100..0x100 + program.len()].copy_from_slice(program);
    rom
}

/// An infinite `JR -2` loop at the entry point. Takes 12 T-cycles per
/// iteration, which divides the frame length evenly.
pub fn spin_rom() -> Vec<u8> {
    rom_with_program(&[0x18, 0xFE])
}
