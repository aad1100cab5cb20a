use std::fmt;

use crate::mmu::Mmu;

// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
const FLAG_Z: u8 = 0x80; // Zero
const FLAG_N: u8 = 0x40; // Subtract
const FLAG_H: u8 = 0x20; // Half Carry
const FLAG_C: u8 = 0x10; // Carry

// Interrupt vectors (gbdev.io/pandocs/Interrupts.html)
const INTERRUPT_VBLANK: u16 = 0x40;
const INTERRUPT_STAT: u16 = 0x48;
const INTERRUPT_TIMER: u16 = 0x50;
const INTERRUPT_SERIAL: u16 = 0x58;
const INTERRUPT_JOYPAD: u16 = 0x60;

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

const BOOT_A: u8 = 0x01;
const BOOT_F: u8 = 0xB0;
const BOOT_B: u8 = 0x00;
const BOOT_C: u8 = 0x13;
const BOOT_D: u8 = 0x00;
const BOOT_E: u8 = 0xD8;
const BOOT_H: u8 = 0x01;
const BOOT_L: u8 = 0x4D;

const CYCLES_PER_M_CYCLE: u16 = 4;

/// A copy of the CPU register file, for inspection by hosts and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub pc: u16,
    pub sp: u16,
}

impl Registers {
    pub fn af(&self) -> u16 {
        ((self.a as u16) << 8) | self.f as u16
    }

    pub fn bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }

    pub fn de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }

    pub fn hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X}",
            self.af(),
            self.bc(),
            self.de(),
            self.hl(),
            self.pc,
            self.sp
        )
    }
}

pub struct Cpu {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub pc: u16,
    pub sp: u16,
    /// T-cycles elapsed since power-on.
    pub cycles: u64,
    pub ime: bool,
    pub halted: bool,
    pub stopped: bool,
    halt_bug: bool,
    ime_enable_delay: u8,
}

impl Cpu {
    /// Create a CPU initialized to the post-boot register state.
    pub fn new() -> Self {
        Self {
            a: BOOT_A,
            f: BOOT_F,
            b: BOOT_B,
            c: BOOT_C,
            d: BOOT_D,
            e: BOOT_E,
            h: BOOT_H,
            l: BOOT_L,
            pc: BOOT_PC,
            sp: BOOT_SP,
            cycles: 0,
            ime: false,
            halted: false,
            stopped: false,
            halt_bug: false,
            ime_enable_delay: 0,
        }
    }

    pub fn registers(&self) -> Registers {
        Registers {
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            pc: self.pc,
            sp: self.sp,
        }
    }

    fn get_bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }

    fn set_bc(&mut self, val: u16) {
        self.b = (val >> 8) as u8;
        self.c = val as u8;
    }

    fn get_de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }

    fn set_de(&mut self, val: u16) {
        self.d = (val >> 8) as u8;
        self.e = val as u8;
    }

    pub fn get_hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }

    fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }

    fn next_interrupt(pending: u8) -> (u8, u16) {
        if pending & 0x01 != 0 {
            (0x01, INTERRUPT_VBLANK)
        } else if pending & 0x02 != 0 {
            (0x02, INTERRUPT_STAT)
        } else if pending & 0x04 != 0 {
            (0x04, INTERRUPT_TIMER)
        } else if pending & 0x08 != 0 {
            (0x08, INTERRUPT_SERIAL)
        } else {
            (0x10, INTERRUPT_JOYPAD)
        }
    }

    /// Advance the hardware clocks by the given number of machine cycles.
    /// Every memory access goes through here, so the peripherals stay in
    /// lockstep with the instruction that touches them.
    #[inline]
    fn tick(&mut self, mmu: &mut Mmu, m_cycles: u8) {
        self.cycles += (CYCLES_PER_M_CYCLE * m_cycles as u16) as u64;
        mmu.tick(m_cycles as u32);
    }

    #[inline(always)]
    fn fetch8(&mut self, mmu: &mut Mmu) -> u8 {
        let val = mmu.read_byte(self.pc);
        self.pc = self.pc.wrapping_add(1);
        self.tick(mmu, 1);
        val
    }

    #[inline(always)]
    fn fetch16(&mut self, mmu: &mut Mmu) -> u16 {
        let lo = self.fetch8(mmu) as u16;
        let hi = self.fetch8(mmu) as u16;
        (hi << 8) | lo
    }

    #[inline(always)]
    fn read8(&mut self, mmu: &mut Mmu, addr: u16) -> u8 {
        let val = mmu.read_byte(addr);
        self.tick(mmu, 1);
        val
    }

    #[inline(always)]
    fn write8(&mut self, mmu: &mut Mmu, addr: u16, val: u8) {
        mmu.write_byte(addr, val);
        self.tick(mmu, 1);
    }

    fn push_stack(&mut self, mmu: &mut Mmu, val: u16) {
        self.sp = self.sp.wrapping_sub(1);
        self.write8(mmu, self.sp, (val >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        self.write8(mmu, self.sp, val as u8);
    }

    fn pop_stack(&mut self, mmu: &mut Mmu) -> u16 {
        let lo = self.read8(mmu, self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        let hi = self.read8(mmu, self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    fn read_reg(&mut self, mmu: &mut Mmu, index: u8) -> u8 {
        match index {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            6 => self.read8(mmu, self.get_hl()),
            7 => self.a,
            _ => unreachable!(),
        }
    }

    fn write_reg(&mut self, mmu: &mut Mmu, index: u8, val: u8) {
        match index {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            6 => {
                let addr = self.get_hl();
                self.write8(mmu, addr, val);
            }
            7 => self.a = val,
            _ => unreachable!(),
        }
    }

    fn handle_cb(&mut self, opcode: u8, mmu: &mut Mmu) {
        match opcode {
            // RLC r
            0x00..=0x07 => {
                let r = opcode & 0x07;
                let val = self.read_reg(mmu, r);
                let res = val.rotate_left(1);
                self.write_reg(mmu, r, res);
                self.f =
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x80 != 0 { FLAG_C } else { 0 };
            }
            // RRC r
            0x08..=0x0F => {
                let r = opcode & 0x07;
                let val = self.read_reg(mmu, r);
                let res = val.rotate_right(1);
                self.write_reg(mmu, r, res);
                self.f =
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x01 != 0 { FLAG_C } else { 0 };
            }
            // RL r
            0x10..=0x17 => {
                let r = opcode & 0x07;
                let val = self.read_reg(mmu, r);
                let carry_in = if self.f & FLAG_C != 0 { 1 } else { 0 };
                let res = (val << 1) | carry_in;
                self.write_reg(mmu, r, res);
                self.f =
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x80 != 0 { FLAG_C } else { 0 };
            }
            // RR r
            0x18..=0x1F => {
                let r = opcode & 0x07;
                let val = self.read_reg(mmu, r);
                let carry_in = if self.f & FLAG_C != 0 { 1u8 } else { 0 };
                let res = (val >> 1) | (carry_in << 7);
                self.write_reg(mmu, r, res);
                self.f =
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x01 != 0 { FLAG_C } else { 0 };
            }
            // SLA r
            0x20..=0x27 => {
                let r = opcode & 0x07;
                let val = self.read_reg(mmu, r);
                let res = val << 1;
                self.write_reg(mmu, r, res);
                self.f =
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x80 != 0 { FLAG_C } else { 0 };
            }
            // SRA r
            0x28..=0x2F => {
                let r = opcode & 0x07;
                let val = self.read_reg(mmu, r);
                let res = (val >> 1) | (val & 0x80);
                self.write_reg(mmu, r, res);
                self.f =
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x01 != 0 { FLAG_C } else { 0 };
            }
            // SWAP r
            0x30..=0x37 => {
                let r = opcode & 0x07;
                let val = self.read_reg(mmu, r);
                let res = val.rotate_left(4);
                self.write_reg(mmu, r, res);
                self.f = if res == 0 { FLAG_Z } else { 0 };
            }
            // SRL r
            0x38..=0x3F => {
                let r = opcode & 0x07;
                let val = self.read_reg(mmu, r);
                let res = val >> 1;
                self.write_reg(mmu, r, res);
                self.f =
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x01 != 0 { FLAG_C } else { 0 };
            }
            // BIT n, r
            0x40..=0x7F => {
                let bit = (opcode - 0x40) >> 3;
                let r = opcode & 0x07;
                let val = self.read_reg(mmu, r);
                self.f =
                    (self.f & FLAG_C) | FLAG_H | if val & (1 << bit) == 0 { FLAG_Z } else { 0 };
            }
            // RES n, r
            0x80..=0xBF => {
                let bit = (opcode - 0x80) >> 3;
                let r = opcode & 0x07;
                let val = self.read_reg(mmu, r) & !(1 << bit);
                self.write_reg(mmu, r, val);
            }
            // SET n, r
            0xC0..=0xFF => {
                let bit = (opcode - 0xC0) >> 3;
                let r = opcode & 0x07;
                let val = self.read_reg(mmu, r) | (1 << bit);
                self.write_reg(mmu, r, val);
            }
        }
    }

    fn handle_interrupts(&mut self, mmu: &mut Mmu) {
        let pending = (mmu.if_reg & mmu.ie_reg) & 0x1F;
        if pending == 0 {
            return;
        }

        if self.ime {
            self.halted = false;
            self.ime = false;
            let return_pc = self.pc;

            // Interrupt entry pushes the return address. If the upper-byte
            // push lands on IE (0xFFFF) it can change which interrupt is
            // dispatched, so re-check between the two pushes.
            self.sp = self.sp.wrapping_sub(1);
            self.write8(mmu, self.sp, (return_pc >> 8) as u8);

            let queue = (mmu.ie_reg & mmu.if_reg) & 0x1F;
            if queue == 0 {
                // Dispatch cancelled; the lower byte push still occurs.
                self.sp = self.sp.wrapping_sub(1);
                self.write8(mmu, self.sp, return_pc as u8);
                self.pc = 0;
                self.tick(mmu, 3);
                return;
            }

            let (bit, vector) = Self::next_interrupt(queue);
            mmu.if_reg &= !bit;

            self.sp = self.sp.wrapping_sub(1);
            self.write8(mmu, self.sp, return_pc as u8);

            self.pc = vector;
            self.tick(mmu, 3);
        } else if self.halted {
            self.halted = false;
        }
    }

    /// Execute one instruction (or service an interrupt / idle while halted)
    /// and return the number of T-cycles it consumed.
    pub fn step(&mut self, mmu: &mut Mmu) -> u32 {
        let start_cycles = self.cycles;

        if self.stopped {
            // STOP idles until the joypad requests an interrupt.
            self.tick(mmu, 1);
            if mmu.if_reg & 0x10 != 0 {
                self.stopped = false;
            }
            return (self.cycles - start_cycles) as u32;
        }

        if self.halted {
            self.tick(mmu, 1);
            self.handle_interrupts(mmu);
            return (self.cycles - start_cycles) as u32;
        }

        #[cfg(feature = "cpu-trace")]
        eprintln!("{} CY:{}", self.registers(), self.cycles);

        let enable_after = self.ime_enable_delay == 1;
        let opcode = if self.halt_bug {
            // HALT bug: the fetch after the failed halt does not advance PC.
            self.halt_bug = false;
            self.read8(mmu, self.pc)
        } else {
            self.fetch8(mmu)
        };
        match opcode {
            0x00 => {}
            0x01 => {
                let val = self.fetch16(mmu);
                self.set_bc(val);
            }
            0x02 => {
                let addr = self.get_bc();
                self.write8(mmu, addr, self.a);
            }
            0x03 => {
                let val = self.get_bc().wrapping_add(1);
                self.set_bc(val);
                self.tick(mmu, 1);
            }
            0x04 => self.b = self.inc8(self.b),
            0x05 => self.b = self.dec8(self.b),
            0x06 => {
                let val = self.fetch8(mmu);
                self.b = val;
            }
            0x07 => {
                let carry = (self.a & 0x80) != 0;
                self.a = self.a.rotate_left(1);
                self.f = if carry { FLAG_C } else { 0 };
            }
            0x08 => {
                let addr = self.fetch16(mmu);
                self.write8(mmu, addr, (self.sp & 0xFF) as u8);
                self.write8(mmu, addr.wrapping_add(1), (self.sp >> 8) as u8);
            }
            0x09 => {
                let bc = self.get_bc();
                self.add_hl(bc);
                self.tick(mmu, 1);
            }
            0x0A => {
                let addr = self.get_bc();
                self.a = self.read8(mmu, addr);
            }
            0x0B => {
                let val = self.get_bc().wrapping_sub(1);
                self.set_bc(val);
                self.tick(mmu, 1);
            }
            0x0C => self.c = self.inc8(self.c),
            0x0D => self.c = self.dec8(self.c),
            0x0E => {
                let val = self.fetch8(mmu);
                self.c = val;
            }
            0x0F => {
                let carry = (self.a & 0x01) != 0;
                self.a = self.a.rotate_right(1);
                self.f = if carry { FLAG_C } else { 0 };
            }
            0x10 => {
                // STOP
                let _ = self.fetch8(mmu);
                mmu.timer.reset_div(&mut mmu.if_reg);
                self.stopped = true;
            }
            0x11 => {
                let val = self.fetch16(mmu);
                self.set_de(val);
            }
            0x12 => {
                let addr = self.get_de();
                self.write8(mmu, addr, self.a);
            }
            0x13 => {
                let val = self.get_de().wrapping_add(1);
                self.set_de(val);
                self.tick(mmu, 1);
            }
            0x14 => self.d = self.inc8(self.d),
            0x15 => self.d = self.dec8(self.d),
            0x16 => {
                let val = self.fetch8(mmu);
                self.d = val;
            }
            0x17 => {
                let carry = (self.a & 0x80) != 0;
                self.a = (self.a << 1) | if self.f & FLAG_C != 0 { 1 } else { 0 };
                self.f = if carry { FLAG_C } else { 0 };
            }
            0x18 => {
                let offset = self.fetch8(mmu) as i8;
                self.pc = self.pc.wrapping_add(offset as u16);
                self.tick(mmu, 1);
            }
            0x19 => {
                let de = self.get_de();
                self.add_hl(de);
                self.tick(mmu, 1);
            }
            0x1A => {
                let addr = self.get_de();
                self.a = self.read8(mmu, addr);
            }
            0x1B => {
                let val = self.get_de().wrapping_sub(1);
                self.set_de(val);
                self.tick(mmu, 1);
            }
            0x1C => self.e = self.inc8(self.e),
            0x1D => self.e = self.dec8(self.e),
            0x1E => {
                let val = self.fetch8(mmu);
                self.e = val;
            }
            0x1F => {
                let carry = (self.a & 0x01) != 0;
                self.a = (self.a >> 1) | if self.f & FLAG_C != 0 { 0x80 } else { 0 };
                self.f = if carry { FLAG_C } else { 0 };
            }
            0x20 => {
                let offset = self.fetch8(mmu) as i8;
                if self.f & FLAG_Z == 0 {
                    self.pc = self.pc.wrapping_add(offset as u16);
                    self.tick(mmu, 1);
                }
            }
            0x21 => {
                let val = self.fetch16(mmu);
                self.set_hl(val);
            }
            0x22 => {
                let addr = self.get_hl();
                self.write8(mmu, addr, self.a);
                self.set_hl(addr.wrapping_add(1));
            }
            0x23 => {
                let val = self.get_hl().wrapping_add(1);
                self.set_hl(val);
                self.tick(mmu, 1);
            }
            0x24 => self.h = self.inc8(self.h),
            0x25 => self.h = self.dec8(self.h),
            0x26 => {
                let val = self.fetch8(mmu);
                self.h = val;
            }
            0x27 => {
                // DAA
                let mut correction = 0u8;
                let mut carry = false;
                if self.f & FLAG_H != 0 || (self.f & FLAG_N == 0 && (self.a & 0x0F) > 9) {
                    correction |= 0x06;
                }
                if self.f & FLAG_C != 0 || (self.f & FLAG_N == 0 && self.a > 0x99) {
                    correction |= 0x60;
                    carry = true;
                }
                if self.f & FLAG_N == 0 {
                    self.a = self.a.wrapping_add(correction);
                } else {
                    self.a = self.a.wrapping_sub(correction);
                }
                self.f = if self.a == 0 { FLAG_Z } else { 0 }
                    | (self.f & FLAG_N)
                    | if carry { FLAG_C } else { 0 };
            }
            0x28 => {
                let offset = self.fetch8(mmu) as i8;
                if self.f & FLAG_Z != 0 {
                    self.pc = self.pc.wrapping_add(offset as u16);
                    self.tick(mmu, 1);
                }
            }
            0x29 => {
                let hl = self.get_hl();
                self.add_hl(hl);
                self.tick(mmu, 1);
            }
            0x2A => {
                let addr = self.get_hl();
                self.a = self.read8(mmu, addr);
                self.set_hl(addr.wrapping_add(1));
            }
            0x2B => {
                let val = self.get_hl().wrapping_sub(1);
                self.set_hl(val);
                self.tick(mmu, 1);
            }
            0x2C => self.l = self.inc8(self.l),
            0x2D => self.l = self.dec8(self.l),
            0x2E => {
                let val = self.fetch8(mmu);
                self.l = val;
            }
            0x2F => {
                // CPL
                self.a ^= 0xFF;
                self.f = (self.f & (FLAG_Z | FLAG_C)) | FLAG_N | FLAG_H;
            }
            0x30 => {
                let offset = self.fetch8(mmu) as i8;
                if self.f & FLAG_C == 0 {
                    self.pc = self.pc.wrapping_add(offset as u16);
                    self.tick(mmu, 1);
                }
            }
            0x31 => {
                let val = self.fetch16(mmu);
                self.sp = val;
            }
            0x32 => {
                let addr = self.get_hl();
                self.write8(mmu, addr, self.a);
                self.set_hl(addr.wrapping_sub(1));
            }
            0x33 => {
                self.sp = self.sp.wrapping_add(1);
                self.tick(mmu, 1);
            }
            0x34 => {
                let addr = self.get_hl();
                let old = self.read8(mmu, addr);
                let val = old.wrapping_add(1);
                self.write8(mmu, addr, val);
                self.f = (self.f & FLAG_C)
                    | if val == 0 { FLAG_Z } else { 0 }
                    | if (old & 0x0F) + 1 > 0x0F { FLAG_H } else { 0 };
            }
            0x35 => {
                let addr = self.get_hl();
                let old = self.read8(mmu, addr);
                let val = old.wrapping_sub(1);
                self.write8(mmu, addr, val);
                self.f = (self.f & FLAG_C)
                    | FLAG_N
                    | if val == 0 { FLAG_Z } else { 0 }
                    | if old & 0x0F == 0 { FLAG_H } else { 0 };
            }
            0x36 => {
                let val = self.fetch8(mmu);
                let addr = self.get_hl();
                self.write8(mmu, addr, val);
            }
            0x37 => {
                // SCF
                self.f = (self.f & FLAG_Z) | FLAG_C;
            }
            0x38 => {
                let offset = self.fetch8(mmu) as i8;
                if self.f & FLAG_C != 0 {
                    self.pc = self.pc.wrapping_add(offset as u16);
                    self.tick(mmu, 1);
                }
            }
            0x39 => {
                let sp = self.sp;
                self.add_hl(sp);
                self.tick(mmu, 1);
            }
            0x3A => {
                let addr = self.get_hl();
                self.a = self.read8(mmu, addr);
                self.set_hl(addr.wrapping_sub(1));
            }
            0x3B => {
                self.sp = self.sp.wrapping_sub(1);
                self.tick(mmu, 1);
            }
            0x3C => self.a = self.inc8(self.a),
            0x3D => self.a = self.dec8(self.a),
            0x3E => {
                let val = self.fetch8(mmu);
                self.a = val;
            }
            0x3F => {
                // CCF
                self.f = (self.f & FLAG_Z) | if self.f & FLAG_C != 0 { 0 } else { FLAG_C };
            }
            opcode @ 0x40..=0x7F if opcode != 0x76 => {
                let dest = (opcode >> 3) & 0x07;
                let src = opcode & 0x07;
                let val = self.read_reg(mmu, src);
                self.write_reg(mmu, dest, val);
            }
            0x76 => {
                // HALT. With IME clear and an interrupt already pending the
                // halt fails and the next fetch repeats a byte.
                let pending = (mmu.if_reg & mmu.ie_reg) & 0x1F;
                if self.ime || pending == 0 {
                    self.halted = true;
                } else {
                    self.halt_bug = true;
                }
            }
            opcode @ 0x80..=0x87 => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.add_a(val, false);
            }
            opcode @ 0x88..=0x8F => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.add_a(val, true);
            }
            opcode @ 0x90..=0x97 => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.sub_a(val, false);
            }
            opcode @ 0x98..=0x9F => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.sub_a(val, true);
            }
            opcode @ 0xA0..=0xA7 => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.a &= val;
                self.f = if self.a == 0 { FLAG_Z } else { 0 } | FLAG_H;
            }
            opcode @ 0xA8..=0xAF => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.a ^= val;
                self.f = if self.a == 0 { FLAG_Z } else { 0 };
            }
            opcode @ 0xB0..=0xB7 => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.a |= val;
                self.f = if self.a == 0 { FLAG_Z } else { 0 };
            }
            opcode @ 0xB8..=0xBF => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.compare_a(val);
            }
            0xC0 => {
                self.tick(mmu, 1);
                if self.f & FLAG_Z == 0 {
                    self.pc = self.pop_stack(mmu);
                    self.tick(mmu, 1);
                }
            }
            0xC1 => {
                let val = self.pop_stack(mmu);
                self.set_bc(val);
            }
            0xC2 => {
                let addr = self.fetch16(mmu);
                if self.f & FLAG_Z == 0 {
                    self.pc = addr;
                    self.tick(mmu, 1);
                }
            }
            0xC3 => {
                let addr = self.fetch16(mmu);
                self.pc = addr;
                self.tick(mmu, 1);
            }
            0xC4 => {
                let addr = self.fetch16(mmu);
                if self.f & FLAG_Z == 0 {
                    self.tick(mmu, 1);
                    self.push_stack(mmu, self.pc);
                    self.pc = addr;
                }
            }
            0xC5 => {
                let val = self.get_bc();
                self.tick(mmu, 1);
                self.push_stack(mmu, val);
            }
            0xC6 => {
                let val = self.fetch8(mmu);
                self.add_a(val, false);
            }
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                // RST
                let target = (opcode & 0x38) as u16;
                self.tick(mmu, 1);
                self.push_stack(mmu, self.pc);
                self.pc = target;
            }
            0xC8 => {
                self.tick(mmu, 1);
                if self.f & FLAG_Z != 0 {
                    self.pc = self.pop_stack(mmu);
                    self.tick(mmu, 1);
                }
            }
            0xC9 => {
                self.pc = self.pop_stack(mmu);
                self.tick(mmu, 1);
            }
            0xCA => {
                let addr = self.fetch16(mmu);
                if self.f & FLAG_Z != 0 {
                    self.pc = addr;
                    self.tick(mmu, 1);
                }
            }
            0xCB => {
                let op = self.fetch8(mmu);
                self.handle_cb(op, mmu);
            }
            0xCC => {
                let addr = self.fetch16(mmu);
                if self.f & FLAG_Z != 0 {
                    self.tick(mmu, 1);
                    self.push_stack(mmu, self.pc);
                    self.pc = addr;
                }
            }
            0xCD => {
                let addr = self.fetch16(mmu);
                self.tick(mmu, 1);
                self.push_stack(mmu, self.pc);
                self.pc = addr;
            }
            0xCE => {
                let val = self.fetch8(mmu);
                self.add_a(val, true);
            }
            0xD0 => {
                self.tick(mmu, 1);
                if self.f & FLAG_C == 0 {
                    self.pc = self.pop_stack(mmu);
                    self.tick(mmu, 1);
                }
            }
            0xD1 => {
                let val = self.pop_stack(mmu);
                self.set_de(val);
            }
            0xD2 => {
                let addr = self.fetch16(mmu);
                if self.f & FLAG_C == 0 {
                    self.pc = addr;
                    self.tick(mmu, 1);
                }
            }
            0xD4 => {
                let addr = self.fetch16(mmu);
                if self.f & FLAG_C == 0 {
                    self.tick(mmu, 1);
                    self.push_stack(mmu, self.pc);
                    self.pc = addr;
                }
            }
            0xD5 => {
                let val = self.get_de();
                self.tick(mmu, 1);
                self.push_stack(mmu, val);
            }
            0xD6 => {
                let val = self.fetch8(mmu);
                self.sub_a(val, false);
            }
            0xD8 => {
                self.tick(mmu, 1);
                if self.f & FLAG_C != 0 {
                    self.pc = self.pop_stack(mmu);
                    self.tick(mmu, 1);
                }
            }
            0xD9 => {
                // RETI
                self.pc = self.pop_stack(mmu);
                self.ime = true;
                self.tick(mmu, 1);
            }
            0xDA => {
                let addr = self.fetch16(mmu);
                if self.f & FLAG_C != 0 {
                    self.pc = addr;
                    self.tick(mmu, 1);
                }
            }
            0xDC => {
                let addr = self.fetch16(mmu);
                if self.f & FLAG_C != 0 {
                    self.tick(mmu, 1);
                    self.push_stack(mmu, self.pc);
                    self.pc = addr;
                }
            }
            0xDE => {
                let val = self.fetch8(mmu);
                self.sub_a(val, true);
            }
            0xE0 => {
                let offset = self.fetch8(mmu);
                let addr = 0xFF00u16 | offset as u16;
                self.write8(mmu, addr, self.a);
            }
            0xE1 => {
                let val = self.pop_stack(mmu);
                self.set_hl(val);
            }
            0xE2 => {
                let addr = 0xFF00u16 | self.c as u16;
                self.write8(mmu, addr, self.a);
            }
            0xE5 => {
                let val = self.get_hl();
                self.tick(mmu, 1);
                self.push_stack(mmu, val);
            }
            0xE6 => {
                let val = self.fetch8(mmu);
                self.a &= val;
                self.f = if self.a == 0 { FLAG_Z } else { 0 } | FLAG_H;
            }
            0xE8 => {
                let val = self.fetch8(mmu) as i8 as i16 as u16;
                let sp = self.sp;
                self.sp = sp.wrapping_add(val);
                self.f = if ((sp & 0xF) + (val & 0xF)) > 0xF { FLAG_H } else { 0 }
                    | if ((sp & 0xFF) + (val & 0xFF)) > 0xFF {
                        FLAG_C
                    } else {
                        0
                    };
                self.tick(mmu, 2);
            }
            0xE9 => {
                self.pc = self.get_hl();
            }
            0xEA => {
                let addr = self.fetch16(mmu);
                self.write8(mmu, addr, self.a);
            }
            0xEE => {
                let val = self.fetch8(mmu);
                self.a ^= val;
                self.f = if self.a == 0 { FLAG_Z } else { 0 };
            }
            0xF0 => {
                let offset = self.fetch8(mmu);
                let addr = 0xFF00u16 | offset as u16;
                self.a = self.read8(mmu, addr);
            }
            0xF1 => {
                let val = self.pop_stack(mmu);
                self.a = (val >> 8) as u8;
                // Lower nibble of F does not exist in hardware.
                self.f = (val as u8) & 0xF0;
            }
            0xF2 => {
                let addr = 0xFF00u16 | self.c as u16;
                self.a = self.read8(mmu, addr);
            }
            0xF3 => {
                self.ime = false;
                self.ime_enable_delay = 0;
            }
            0xF5 => {
                let val = ((self.a as u16) << 8) | (self.f as u16 & 0xF0);
                self.tick(mmu, 1);
                self.push_stack(mmu, val);
            }
            0xF6 => {
                let val = self.fetch8(mmu);
                self.a |= val;
                self.f = if self.a == 0 { FLAG_Z } else { 0 };
            }
            0xF8 => {
                let val = self.fetch8(mmu) as i8 as i16 as u16;
                let sp = self.sp;
                let res = sp.wrapping_add(val);
                self.f = if ((sp & 0xF) + (val & 0xF)) > 0xF { FLAG_H } else { 0 }
                    | if ((sp & 0xFF) + (val & 0xFF)) > 0xFF {
                        FLAG_C
                    } else {
                        0
                    };
                self.set_hl(res);
                self.tick(mmu, 1);
            }
            0xF9 => {
                self.sp = self.get_hl();
                self.tick(mmu, 1);
            }
            0xFA => {
                let addr = self.fetch16(mmu);
                self.a = self.read8(mmu, addr);
            }
            0xFB => {
                // EI takes effect after the following instruction.
                self.ime_enable_delay = 2;
            }
            0xFE => {
                let val = self.fetch8(mmu);
                self.compare_a(val);
            }
            _ => {
                // 0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB..=0xED, 0xF4, 0xFC, 0xFD
                // do not decode to anything on this CPU. Execute as NOP so a
                // wild jump into data does not take the whole emulator down.
                log::warn!(
                    "illegal opcode {:02X} at {:04X}, executing as NOP",
                    opcode,
                    self.pc.wrapping_sub(1)
                );
            }
        }

        if enable_after && self.ime_enable_delay > 0 {
            self.ime = true;
        }
        if self.ime_enable_delay > 0 {
            self.ime_enable_delay -= 1;
        }
        self.handle_interrupts(mmu);

        (self.cycles - start_cycles) as u32
    }

    fn inc8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_add(1);
        self.f = (self.f & FLAG_C)
            | if res == 0 { FLAG_Z } else { 0 }
            | if (val & 0x0F) + 1 > 0x0F { FLAG_H } else { 0 };
        res
    }

    fn dec8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_sub(1);
        self.f = (self.f & FLAG_C)
            | FLAG_N
            | if res == 0 { FLAG_Z } else { 0 }
            | if val & 0x0F == 0 { FLAG_H } else { 0 };
        res
    }

    fn add_hl(&mut self, val: u16) {
        let hl = self.get_hl();
        let res = hl.wrapping_add(val);
        self.f = (self.f & FLAG_Z)
            | if ((hl & 0x0FFF) + (val & 0x0FFF)) & 0x1000 != 0 {
                FLAG_H
            } else {
                0
            }
            | if (hl as u32 + val as u32) > 0xFFFF {
                FLAG_C
            } else {
                0
            };
        self.set_hl(res);
    }

    fn add_a(&mut self, val: u8, with_carry: bool) {
        let carry_in = if with_carry && self.f & FLAG_C != 0 { 1 } else { 0 };
        let (res1, carry1) = self.a.overflowing_add(val);
        let (res2, carry2) = res1.overflowing_add(carry_in);
        self.f = if res2 == 0 { FLAG_Z } else { 0 }
            | if (self.a & 0x0F) + (val & 0x0F) + carry_in > 0x0F {
                FLAG_H
            } else {
                0
            }
            | if carry1 || carry2 { FLAG_C } else { 0 };
        self.a = res2;
    }

    fn sub_a(&mut self, val: u8, with_carry: bool) {
        let carry_in = if with_carry && self.f & FLAG_C != 0 { 1 } else { 0 };
        let (res1, borrow1) = self.a.overflowing_sub(val);
        let (res2, borrow2) = res1.overflowing_sub(carry_in);
        self.f = FLAG_N
            | if res2 == 0 { FLAG_Z } else { 0 }
            | if (self.a & 0x0F) < (val & 0x0F) + carry_in {
                FLAG_H
            } else {
                0
            }
            | if borrow1 || borrow2 { FLAG_C } else { 0 };
        self.a = res2;
    }

    fn compare_a(&mut self, val: u8) {
        let res = self.a.wrapping_sub(val);
        self.f = FLAG_N
            | if res == 0 { FLAG_Z } else { 0 }
            | if (self.a & 0x0F) < (val & 0x0F) { FLAG_H } else { 0 }
            | if self.a < val { FLAG_C } else { 0 };
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
