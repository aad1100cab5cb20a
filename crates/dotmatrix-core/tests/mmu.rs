mod common;

use dotmatrix_core::{cartridge::Cartridge, mmu::Mmu};

fn mmu_with_rom() -> Mmu {
    let mut mmu = Mmu::new();
    let cart = Cartridge::load(common::rom_with_program(&[0x18, 0xFE])).expect("valid rom");
    mmu.load_cart(cart);
    mmu
}

#[test]
fn wram_echo_mirrors_writes() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xC000, 0xAA);
    assert_eq!(mmu.read_byte(0xC000), 0xAA);
    assert_eq!(mmu.read_byte(0xE000), 0xAA);
    mmu.write_byte(0xE123, 0xBB);
    assert_eq!(mmu.read_byte(0xC123), 0xBB);
}

#[test]
fn rom_writes_are_mapper_commands_not_stores() {
    let mut mmu = mmu_with_rom();
    let before = mmu.read_byte(0x0100);
    mmu.write_byte(0x0100, 0x55);
    assert_eq!(mmu.read_byte(0x0100), before);
}

#[test]
fn unmapped_regions_read_ff() {
    let mut mmu = Mmu::new();
    // No cartridge inserted.
    assert_eq!(mmu.read_byte(0x0000), 0xFF);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
    // Unusable region.
    assert_eq!(mmu.read_byte(0xFEA0), 0xFF);
    assert_eq!(mmu.read_byte(0xFEFF), 0xFF);
    mmu.write_byte(0xFEA0, 0x12);
    assert_eq!(mmu.read_byte(0xFEA0), 0xFF);
}

#[test]
fn hram_round_trip() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFF80, 0x5A);
    mmu.write_byte(0xFFFE, 0xA5);
    assert_eq!(mmu.read_byte(0xFF80), 0x5A);
    assert_eq!(mmu.read_byte(0xFFFE), 0xA5);
}

#[test]
fn oam_dma_copies_from_wram() {
    let mut mmu = Mmu::new();
    for i in 0..0xA0u16 {
        mmu.write_byte(0xC000 + i, i as u8);
    }
    mmu.write_byte(0xFF46, 0xC0);
    for i in 0..0xA0usize {
        assert_eq!(mmu.ppu.oam[i], i as u8);
    }
    // The register reads back the last written source page.
    assert_eq!(mmu.read_byte(0xFF46), 0xC0);
}

#[test]
fn vram_blocked_during_pixel_transfer() {
    let mut mmu = Mmu::new();
    mmu.ppu.mode = 0;
    mmu.write_byte(0x8000, 0x11);
    assert_eq!(mmu.read_byte(0x8000), 0x11);

    mmu.ppu.mode = 3;
    assert_eq!(mmu.read_byte(0x8000), 0xFF);
    mmu.write_byte(0x8000, 0x22);

    mmu.ppu.mode = 0;
    assert_eq!(mmu.read_byte(0x8000), 0x11, "blocked write was dropped");
}

#[test]
fn oam_blocked_during_scan_and_transfer() {
    let mut mmu = Mmu::new();
    mmu.ppu.mode = 1;
    mmu.write_byte(0xFE00, 0x42);
    assert_eq!(mmu.read_byte(0xFE00), 0x42);

    mmu.ppu.mode = 2;
    assert_eq!(mmu.read_byte(0xFE00), 0xFF);
    mmu.write_byte(0xFE00, 0x99);

    mmu.ppu.mode = 1;
    assert_eq!(mmu.read_byte(0xFE00), 0x42);
}

#[test]
fn interrupt_registers_round_trip() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFFFF, 0x1F);
    assert_eq!(mmu.read_byte(0xFFFF), 0x1F);
    mmu.write_byte(0xFF0F, 0x05);
    // Upper IF bits are unimplemented and read back set.
    assert_eq!(mmu.read_byte(0xFF0F), 0xE5);
}

#[test]
fn timer_ticks_through_the_bus() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFF04, 0); // reset DIV so the edge phase is known
    mmu.write_byte(0xFF07, 0x05); // enable, increment every 16 T-cycles
    mmu.write_byte(0xFF05, 0x00);
    mmu.tick(8); // 32 T-cycles
    assert_eq!(mmu.read_byte(0xFF05), 2);
}
