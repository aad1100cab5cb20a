//! Game Boy (DMG) emulation core.
//!
//! This crate contains the platform-agnostic emulator logic (CPU/MMU/PPU/
//! joypad/timer). Hosts drive the core through the [`gameboy`] facade: step
//! until a frame is ready, blit the frame buffer, acknowledge, repeat.

/// Cartridge header parsing and mapper (MBC) banking.
pub mod cartridge;

/// SM83 CPU core.
pub mod cpu;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Joypad input register and edge-triggered interrupt behavior.
pub mod input;

/// Memory map and hardware plumbing.
pub mod mmu;

/// Pixel Processing Unit (PPU) emulation.
pub mod ppu;

/// Serial registers (link cable is not emulated; output is captured).
pub mod serial;

/// Divider/timer unit.
pub mod timer;
