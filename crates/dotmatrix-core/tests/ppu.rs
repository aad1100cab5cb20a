mod common;

use dotmatrix_core::gameboy::GameBoy;
use dotmatrix_core::ppu::{Ppu, FRAME_BYTES, SCREEN_HEIGHT, SCREEN_WIDTH};

// Lightest shade of the fixed DMG palette.
const SHADE_0: [u8; 4] = [0x9B, 0xBC, 0x0F, 0xFF];

const DOTS_PER_FRAME: u64 = 456 * 154;

fn spinning_gb() -> GameBoy {
    GameBoy::with_rom(common::spin_rom()).expect("valid rom")
}

#[test]
fn frames_are_70224_dots_apart() {
    let mut gb = spinning_gb();

    gb.run_until_frame();
    let first = gb.cycles();
    // Power-on starts at the top of the visible field, so the first frame
    // completes after the 144 visible lines.
    assert_eq!(first, 456 * SCREEN_HEIGHT as u64);

    gb.end_frame();
    gb.run_until_frame();
    assert_eq!(gb.cycles() - first, DOTS_PER_FRAME);
    assert_eq!(gb.frames(), 2);
}

#[test]
fn dots_track_executed_cycles_in_lockstep() {
    // Mixed instruction lengths so steps land on 4, 8, and 12 cycle costs.
    let mut gb = GameBoy::with_rom(common::rom_with_program(&[
        0x00, // NOP
        0x3E, 0x55, // LD A, 0x55
        0x04, // INC B
        0x77, // LD (HL), A
        0x18, 0xF9, // JR back to the top
    ]))
    .expect("valid rom");

    let mut total = 0u64;
    for _ in 0..10_000 {
        let spent = gb.step();
        assert!(spent > 0);
        total += u64::from(spent);
        assert_eq!(gb.mmu.ppu.dots, gb.cycles());
    }
    assert_eq!(total, gb.cycles());
}

#[test]
fn frame_ready_persists_until_acknowledged() {
    let mut gb = spinning_gb();
    gb.run_until_frame();
    assert!(gb.frame_ready());

    // Emulation may continue; the flag stays up until the host consumes it.
    for _ in 0..100 {
        gb.step();
    }
    assert!(gb.frame_ready());

    gb.end_frame();
    assert!(!gb.frame_ready());
}

#[test]
fn run_until_frame_is_idempotent_while_unacknowledged() {
    let mut gb = spinning_gb();
    gb.run_until_frame();
    let cycles = gb.cycles();
    gb.run_until_frame();
    assert_eq!(gb.cycles(), cycles, "no emulation until the frame is acked");
}

#[test]
fn vblank_interrupt_requested_at_frame_start() {
    let mut gb = spinning_gb();
    gb.mmu.if_reg = 0;
    gb.run_until_frame();
    assert_eq!(gb.mmu.if_reg & 0x01, 0x01);
}

#[test]
fn blank_frame_is_uniform_and_opaque() {
    let mut gb = spinning_gb();
    gb.run_until_frame();
    let frame = gb.frame();
    assert_eq!(frame.len(), FRAME_BYTES);
    assert_eq!(FRAME_BYTES, SCREEN_WIDTH * SCREEN_HEIGHT * 4);
    for pixel in frame.chunks_exact(4) {
        assert_eq!(pixel, SHADE_0);
    }
}

#[test]
fn ly_advances_and_wraps() {
    let mut ppu = Ppu::new();
    let mut if_reg = 0u8;
    ppu.step(456, &mut if_reg);
    assert_eq!(ppu.read_reg(0xFF44), 1);
    ppu.step(456 * 152, &mut if_reg);
    assert_eq!(ppu.read_reg(0xFF44), 153);
    ppu.step(456, &mut if_reg);
    assert_eq!(ppu.read_reg(0xFF44), 0);
}

#[test]
fn lyc_coincidence_raises_stat_interrupt() {
    let mut ppu = Ppu::new();
    let mut if_reg = 0u8;
    ppu.write_reg(0xFF45, 10);
    ppu.write_reg(0xFF41, 0x40); // LYC=LY source enabled
    ppu.step(456 * 9, &mut if_reg);
    assert_eq!(if_reg & 0x02, 0, "no coincidence before line 10");
    ppu.step(456, &mut if_reg);
    assert_eq!(if_reg & 0x02, 0x02);
    // STAT coincidence bit reflects the comparison.
    assert_eq!(ppu.read_reg(0xFF41) & 0x04, 0x04);
}

#[test]
fn stat_interrupt_is_edge_triggered() {
    let mut ppu = Ppu::new();
    let mut if_reg = 0u8;
    ppu.write_reg(0xFF41, 0x08); // HBlank source
    ppu.step(300, &mut if_reg); // into mode 0 of line 0
    assert_eq!(if_reg & 0x02, 0x02);

    // Staying in HBlank must not request again.
    if_reg = 0;
    ppu.step(100, &mut if_reg);
    assert_eq!(if_reg & 0x02, 0);
}

#[test]
fn disabling_lcd_resets_scanout() {
    let mut ppu = Ppu::new();
    let mut if_reg = 0u8;
    ppu.step(456 * 5, &mut if_reg);
    assert_eq!(ppu.read_reg(0xFF44), 5);
    ppu.write_reg(0xFF40, 0x11); // LCD off
    assert_eq!(ppu.ly(), 0);
    ppu.step(456 * 3, &mut if_reg);
    assert_eq!(ppu.ly(), 0, "LY holds at 0 while disabled");
}

#[test]
fn background_tile_renders_expected_shades() {
    let mut ppu = Ppu::new();
    let mut if_reg = 0u8;

    // Identity palette: color N maps to shade N.
    ppu.write_reg(0xFF47, 0xE4);
    // Tile 1: all pixels color 3 (both bitplanes set).
    for i in 0..16 {
        ppu.vram[16 + i] = 0xFF;
    }
    // Tile map entry (0, 0) uses tile 1; the rest stay tile 0 (color 0).
    ppu.vram[0x1800] = 1;

    ppu.step(456, &mut if_reg); // render line 0

    let frame = ppu.frame_in_progress();
    // First 8 pixels are the darkest shade, the ninth is the lightest.
    for x in 0..8 {
        assert_eq!(frame[x * 4..x * 4 + 4], [0x0F, 0x38, 0x0F, 0xFF]);
    }
    assert_eq!(frame[8 * 4..8 * 4 + 4], SHADE_0);
}

#[test]
fn sprite_overrides_background() {
    let mut ppu = Ppu::new();
    let mut if_reg = 0u8;

    ppu.write_reg(0xFF40, 0x93); // sprites on
    ppu.write_reg(0xFF47, 0xE4);
    ppu.write_reg(0xFF48, 0xE4);
    // Tile 1: solid color 3.
    for i in 0..16 {
        ppu.vram[16 + i] = 0xFF;
    }
    // Sprite 0 at screen (0, 0) using tile 1.
    ppu.oam[0] = 16;
    ppu.oam[1] = 8;
    ppu.oam[2] = 1;
    ppu.oam[3] = 0;

    ppu.step(456, &mut if_reg);

    let frame = ppu.frame_in_progress();
    assert_eq!(frame[0..4], [0x0F, 0x38, 0x0F, 0xFF]);
    assert_eq!(frame[8 * 4..8 * 4 + 4], SHADE_0, "sprite is 8 pixels wide");
}
