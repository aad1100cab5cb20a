mod common;

use dotmatrix_core::gameboy::GameBoy;

fn gb_with(program: &[u8]) -> GameBoy {
    GameBoy::with_rom(common::rom_with_program(program)).expect("valid rom")
}

#[test]
fn add_overflow_sets_zero_half_and_carry() {
    // LD A, 0xFF; ADD A, 0x01
    let mut gb = gb_with(&[0x3E, 0xFF, 0xC6, 0x01]);
    gb.step();
    gb.step();
    let regs = gb.registers();
    assert_eq!(regs.a, 0x00);
    assert_eq!(regs.f, 0x80 | 0x20 | 0x10);
}

#[test]
fn sub_borrow_sets_carry_and_half() {
    // LD A, 0x10; SUB 0x21
    let mut gb = gb_with(&[0x3E, 0x10, 0xD6, 0x21]);
    gb.step();
    gb.step();
    let regs = gb.registers();
    assert_eq!(regs.a, 0xEF);
    // N always set for SUB; 0x0 < 0x1 gives half borrow, 0x10 < 0x21 full.
    assert_eq!(regs.f, 0x40 | 0x20 | 0x10);
}

#[test]
fn instruction_cycle_counts() {
    // NOP; LD A, d8; JP a16
    let mut gb = gb_with(&[0x00, 0x3E, 0x42, 0xC3, 0x00, 0x01]);
    assert_eq!(gb.step(), 4);
    assert_eq!(gb.step(), 8);
    assert_eq!(gb.step(), 16);
    assert_eq!(gb.registers().pc, 0x0100);
}

#[test]
fn daa_adjusts_bcd_addition() {
    // LD A, 0x15; ADD A, 0x27; DAA -> 0x42
    let mut gb = gb_with(&[0x3E, 0x15, 0xC6, 0x27, 0x27]);
    gb.step();
    gb.step();
    gb.step();
    assert_eq!(gb.registers().a, 0x42);
}

#[test]
fn cb_bit_and_set() {
    // LD A, 0x00; BIT 7, A; SET 7, A; BIT 7, A
    let mut gb = gb_with(&[0x3E, 0x00, 0xCB, 0x7F, 0xCB, 0xFF, 0xCB, 0x7F]);
    gb.step();
    gb.step();
    assert_ne!(gb.registers().f & 0x80, 0, "BIT on a clear bit sets Z");
    gb.step();
    assert_eq!(gb.registers().a, 0x80);
    gb.step();
    assert_eq!(gb.registers().f & 0x80, 0, "BIT on a set bit clears Z");
}

#[test]
fn ei_takes_effect_after_following_instruction() {
    // EI; NOP; NOP
    let mut gb = gb_with(&[0xFB, 0x00, 0x00]);
    gb.mmu.if_reg = 0x04;
    gb.mmu.ie_reg = 0x04;

    gb.step(); // EI itself does not enable interrupts yet
    assert_eq!(gb.registers().pc, 0x0101);

    gb.step(); // NOP executes, then the timer interrupt is dispatched
    assert_eq!(gb.registers().pc, 0x0050);
    assert_eq!(gb.mmu.if_reg & 0x04, 0, "serviced interrupt is acknowledged");
    assert!(!gb.cpu.ime);
}

#[test]
fn interrupt_dispatch_pushes_return_address() {
    let mut gb = gb_with(&[0xFB, 0x00, 0x00]);
    gb.mmu.if_reg = 0x01;
    gb.mmu.ie_reg = 0x01;

    gb.step();
    let sp_before = gb.registers().sp;
    // NOP (4) plus the 5 machine cycle interrupt entry (20).
    assert_eq!(gb.step(), 24);

    let regs = gb.registers();
    assert_eq!(regs.pc, 0x0040);
    assert_eq!(regs.sp, sp_before.wrapping_sub(2));
    let lo = gb.mmu.read_byte(regs.sp) as u16;
    let hi = gb.mmu.read_byte(regs.sp.wrapping_add(1)) as u16;
    assert_eq!((hi << 8) | lo, 0x0102);
}

#[test]
fn interrupt_priority_prefers_vblank() {
    let mut gb = gb_with(&[0xFB, 0x00, 0x00]);
    gb.mmu.if_reg = 0x01 | 0x04;
    gb.mmu.ie_reg = 0x1F;

    gb.step();
    gb.step();
    assert_eq!(gb.registers().pc, 0x0040);
    // The timer request stays pending.
    assert_eq!(gb.mmu.if_reg & 0x04, 0x04);
}

#[test]
fn halt_wakes_without_dispatch_when_ime_clear() {
    // HALT; NOP
    let mut gb = gb_with(&[0x76, 0x00]);
    gb.mmu.if_reg = 0;
    gb.mmu.ie_reg = 0x04;

    gb.step();
    assert!(gb.cpu.halted);
    let pc_halted = gb.registers().pc;

    gb.step();
    assert!(gb.cpu.halted, "no interrupt pending keeps the CPU halted");
    assert_eq!(gb.registers().pc, pc_halted);

    gb.mmu.if_reg = 0x04;
    gb.step();
    assert!(!gb.cpu.halted);
    gb.step();
    // Execution resumes after the HALT, not at the interrupt vector.
    assert_eq!(gb.registers().pc, 0x0102);
    assert_eq!(gb.mmu.if_reg & 0x04, 0x04, "request was not consumed");
}

#[test]
fn illegal_opcode_executes_as_nop() {
    // 0xD3 does not decode; LD A, 0x42 should still run afterwards.
    let mut gb = gb_with(&[0xD3, 0x3E, 0x42]);
    let a_before = gb.registers().a;
    gb.step();
    let regs = gb.registers();
    assert_eq!(regs.pc, 0x0101);
    assert_eq!(regs.a, a_before);
    gb.step();
    assert_eq!(gb.registers().a, 0x42);
}

#[test]
fn push_pop_round_trip_masks_flag_low_bits() {
    // LD BC, 0x12FF; PUSH BC; POP AF
    let mut gb = gb_with(&[0x01, 0xFF, 0x12, 0xC5, 0xF1]);
    gb.step();
    gb.step();
    gb.step();
    let regs = gb.registers();
    assert_eq!(regs.a, 0x12);
    assert_eq!(regs.f, 0xF0, "low nibble of F is not backed by hardware");
}
