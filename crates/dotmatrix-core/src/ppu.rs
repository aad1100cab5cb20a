// Screen resolution of the DMG LCD
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

/// Size in bytes of one RGBA frame.
pub const FRAME_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT * 4;

// Timing constants per LCD mode in T-cycles (dots)
const MODE0_CYCLES: u16 = 204; // HBlank
const MODE1_CYCLES: u16 = 456; // One line during VBlank
const MODE2_CYCLES: u16 = 80; // OAM scan
const MODE3_CYCLES: u16 = 172; // Pixel transfer

// Number of lines spent in VBlank
const VBLANK_LINES: u8 = 10;

// Sprite limits
const MAX_SPRITES_PER_LINE: usize = 10;
const TOTAL_SPRITES: usize = 40;

// Internal memory sizes
const VRAM_SIZE: usize = 0x2000;
const OAM_SIZE: usize = 0xA0;

// Window X position is clipped if greater than this value
const WINDOW_X_MAX: u8 = 166;

// VRAM layout constants
const BG_MAP_0_BASE: usize = 0x1800;
const BG_MAP_1_BASE: usize = 0x1C00;
const TILE_DATA_0_BASE: usize = 0x0000;
const TILE_DATA_1_BASE: usize = 0x0800;

// LCD modes used in the `mode` field
const MODE_HBLANK: u8 = 0;
const MODE_VBLANK: u8 = 1;
const MODE_OAM: u8 = 2;
const MODE_TRANSFER: u8 = 3;

/// DMG shade ramp as opaque RGBA, lightest to darkest.
const DMG_PALETTE: [[u8; 4]; 4] = [
    [0x9B, 0xBC, 0x0F, 0xFF],
    [0x8B, 0xAC, 0x0F, 0xFF],
    [0x30, 0x62, 0x30, 0xFF],
    [0x0F, 0x38, 0x0F, 0xFF],
];

#[derive(Copy, Clone, Default)]
struct Sprite {
    x: i16,
    y: i16,
    tile: u8,
    flags: u8,
    oam_index: usize,
}

pub struct Ppu {
    pub vram: [u8; VRAM_SIZE],
    pub oam: [u8; OAM_SIZE],

    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,

    /// Internal window line counter
    win_line_counter: u8,

    mode_clock: u16,
    pub mode: u8,

    /// Scanlines are rendered into this working buffer as the beam advances.
    framebuffer: [u8; FRAME_BYTES],
    /// Completed frame handed to the host; only overwritten at V-Blank entry,
    /// so it is never torn.
    front: [u8; FRAME_BYTES],
    line_color_zero: [bool; SCREEN_WIDTH],
    /// Latched sprites for the current scanline
    line_sprites: [Sprite; MAX_SPRITES_PER_LINE],
    sprite_count: usize,
    /// A completed frame is available in `front`. Set at V-Blank entry and
    /// cleared only by explicit host acknowledgment.
    frame_ready: bool,
    stat_irq_line: bool,
    frame_counter: u64,
    /// Cumulative dot count since power-on.
    pub dots: u64,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            vram: [0; VRAM_SIZE],
            oam: [0; OAM_SIZE],
            // Post-boot register state (gbdev.io/pandocs/Power_Up_State.html)
            lcdc: 0x91,
            stat: 0x00,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            bgp: 0xFC,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,
            win_line_counter: 0,
            mode_clock: 0,
            mode: MODE_OAM,
            framebuffer: [0; FRAME_BYTES],
            front: [0; FRAME_BYTES],
            line_color_zero: [false; SCREEN_WIDTH],
            line_sprites: [Sprite::default(); MAX_SPRITES_PER_LINE],
            sprite_count: 0,
            frame_ready: false,
            stat_irq_line: false,
            frame_counter: 0,
            dots: 0,
        }
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & 0x80 != 0
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    /// CPU access to VRAM is blocked during pixel transfer.
    pub fn vram_accessible(&self) -> bool {
        !self.lcd_enabled() || self.mode != MODE_TRANSFER
    }

    /// CPU access to OAM is blocked during OAM scan and pixel transfer.
    pub fn oam_accessible(&self) -> bool {
        !self.lcd_enabled() || (self.mode != MODE_OAM && self.mode != MODE_TRANSFER)
    }

    /// Returns true if a full frame has been rendered and is ready to display.
    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// The last completed frame, 160x144 row-major RGBA with opaque alpha.
    pub fn frame(&self) -> &[u8; FRAME_BYTES] {
        &self.front
    }

    /// The working buffer the beam is currently rendering into. Scanlines at
    /// or below LY are from the frame in progress.
    pub fn frame_in_progress(&self) -> &[u8; FRAME_BYTES] {
        &self.framebuffer
    }

    /// Clears the frame ready flag after the host has consumed the frame.
    pub fn clear_frame_flag(&mut self) {
        self.frame_ready = false;
    }

    /// Returns the number of frames completed since power on.
    pub fn frames(&self) -> u64 {
        self.frame_counter
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => 0x80 | (self.stat & 0x78) | self.coincidence_bit() | (self.mode & 0x03),
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF40 => {
                let was_on = self.lcd_enabled();
                self.lcdc = val;
                if was_on && !self.lcd_enabled() {
                    self.mode = MODE_HBLANK;
                    self.mode_clock = 0;
                    self.win_line_counter = 0;
                    self.ly = 0;
                }
            }
            0xFF41 => self.stat = (self.stat & 0x07) | (val & 0xF8),
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            0xFF44 => {} // LY is read-only
            0xFF45 => self.lyc = val,
            0xFF47 => self.bgp = val,
            0xFF48 => self.obp0 = val,
            0xFF49 => self.obp1 = val,
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            _ => {}
        }
    }

    fn coincidence_bit(&self) -> u8 {
        if self.ly == self.lyc { 0x04 } else { 0 }
    }

    /// Advance the PPU by `cycles` dots, stepping in small increments so a
    /// single CPU instruction can cross mode and scanline boundaries.
    pub fn step(&mut self, cycles: u32, if_reg: &mut u8) {
        self.dots += cycles as u64;
        let mut remaining = cycles;
        while remaining > 0 {
            let increment = remaining.min(4) as u16;
            remaining -= increment as u32;

            if !self.lcd_enabled() {
                self.mode = MODE_HBLANK;
                self.ly = 0;
                self.mode_clock = 0;
                self.win_line_counter = 0;
                continue;
            }

            self.mode_clock += increment;

            match self.mode {
                MODE_HBLANK => {
                    if self.mode_clock >= MODE0_CYCLES {
                        self.mode_clock -= MODE0_CYCLES;
                        self.ly += 1;
                        if self.ly == SCREEN_HEIGHT as u8 {
                            self.enter_vblank(if_reg);
                        } else {
                            self.mode = MODE_OAM;
                        }
                    }
                }
                MODE_VBLANK => {
                    if self.mode_clock >= MODE1_CYCLES {
                        self.mode_clock -= MODE1_CYCLES;
                        self.ly += 1;
                        if self.ly > SCREEN_HEIGHT as u8 + VBLANK_LINES - 1 {
                            self.ly = 0;
                            self.win_line_counter = 0;
                            self.mode = MODE_OAM;
                        }
                    }
                }
                MODE_OAM => {
                    if self.mode_clock >= MODE2_CYCLES {
                        self.mode_clock -= MODE2_CYCLES;
                        self.oam_scan();
                        self.mode = MODE_TRANSFER;
                    }
                }
                MODE_TRANSFER => {
                    if self.mode_clock >= MODE3_CYCLES {
                        self.mode_clock -= MODE3_CYCLES;
                        self.render_scanline();
                        self.mode = MODE_HBLANK;
                    }
                }
                _ => unreachable!(),
            }

            self.update_stat_irq(if_reg);
        }
    }

    fn enter_vblank(&mut self, if_reg: &mut u8) {
        self.mode = MODE_VBLANK;
        self.front.copy_from_slice(&self.framebuffer);
        self.frame_counter = self.frame_counter.wrapping_add(1);
        self.frame_ready = true;
        *if_reg |= 0x01;
        #[cfg(feature = "ppu-trace")]
        eprintln!("[PPU] frame {} complete at dot {}", self.frame_counter, self.dots);
    }

    /// Rising-edge STAT interrupt: the individual sources are ORed into one
    /// internal line and an interrupt is requested only on its 0->1 edge.
    fn update_stat_irq(&mut self, if_reg: &mut u8) {
        let coincidence = self.ly == self.lyc && self.stat & 0x40 != 0;
        let mode_signal = match self.mode {
            MODE_HBLANK => self.stat & 0x08 != 0,
            MODE_VBLANK => self.stat & 0x10 != 0,
            MODE_OAM => self.stat & 0x20 != 0,
            _ => false,
        };
        let current = coincidence || mode_signal;
        if current && !self.stat_irq_line {
            *if_reg |= 0x02;
        }
        self.stat_irq_line = current;
    }

    /// Collect up to 10 sprites visible on the current scanline, in
    /// DMG priority order (leftmost X first, OAM index breaking ties).
    fn oam_scan(&mut self) {
        let sprite_height: i16 = if self.lcdc & 0x04 != 0 { 16 } else { 8 };
        self.sprite_count = 0;
        for i in 0..TOTAL_SPRITES {
            if self.sprite_count >= MAX_SPRITES_PER_LINE {
                break;
            }
            let base = i * 4;
            let y = self.oam[base] as i16 - 16;
            if self.ly as i16 >= y && (self.ly as i16) < y + sprite_height {
                self.line_sprites[self.sprite_count] = Sprite {
                    x: self.oam[base + 1] as i16 - 8,
                    y,
                    tile: self.oam[base + 2],
                    flags: self.oam[base + 3],
                    oam_index: i,
                };
                self.sprite_count += 1;
            }
        }
        self.line_sprites[..self.sprite_count].sort_by_key(|s| (s.x, s.oam_index));
    }

    #[inline(always)]
    fn dmg_shade(palette: u8, color_id: u8) -> u8 {
        (palette >> (color_id * 2)) & 0x03
    }

    #[inline(always)]
    fn put_pixel(&mut self, x: usize, shade: u8) {
        let idx = (self.ly as usize * SCREEN_WIDTH + x) * 4;
        self.framebuffer[idx..idx + 4].copy_from_slice(&DMG_PALETTE[shade as usize]);
    }

    fn tile_row(&self, tile_index: u8, tile_y: usize) -> (u8, u8) {
        let addr = if self.lcdc & 0x10 != 0 {
            TILE_DATA_0_BASE + tile_index as usize * 16
        } else {
            TILE_DATA_1_BASE + ((tile_index as i8 as i16 + 128) as usize) * 16
        };
        (self.vram[addr + tile_y * 2], self.vram[addr + tile_y * 2 + 1])
    }

    fn render_scanline(&mut self) {
        if !self.lcd_enabled() || self.ly as usize >= SCREEN_HEIGHT {
            return;
        }

        self.line_color_zero = [true; SCREEN_WIDTH];

        // With the background disabled via LCDC bit 0 the line is color 0
        // and sprites composite against that.
        let bg_shade = Self::dmg_shade(self.bgp, 0);
        for x in 0..SCREEN_WIDTH {
            self.put_pixel(x, bg_shade);
        }

        if self.lcdc & 0x01 != 0 {
            self.render_background();
            self.render_window();
        }
        if self.lcdc & 0x02 != 0 {
            self.render_sprites();
        }
    }

    fn render_background(&mut self) {
        let tile_map_base = if self.lcdc & 0x08 != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let bg_y = (self.ly as u16 + self.scy as u16) & 0xFF;
        let tile_row = (bg_y / 8) as usize;
        let tile_y = (bg_y % 8) as usize;

        for x in 0..SCREEN_WIDTH as u16 {
            let px = x.wrapping_add(self.scx as u16) & 0xFF;
            let tile_col = (px / 8) as usize;
            let tile_index = self.vram[tile_map_base + tile_row * 32 + tile_col];
            let (lo, hi) = self.tile_row(tile_index, tile_y);
            let bit = 7 - (px % 8) as usize;
            let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
            self.line_color_zero[x as usize] = color_id == 0;
            self.put_pixel(x as usize, Self::dmg_shade(self.bgp, color_id));
        }
    }

    fn render_window(&mut self) {
        if self.lcdc & 0x20 == 0 || self.ly < self.wy || self.wx > WINDOW_X_MAX {
            return;
        }
        let wx = self.wx.saturating_sub(7) as usize;
        let map_base = if self.lcdc & 0x40 != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let window_y = self.win_line_counter as usize;
        let tile_row = window_y / 8;
        let tile_y = window_y % 8;

        for x in wx..SCREEN_WIDTH {
            let window_x = x - wx;
            let tile_col = window_x / 8;
            let tile_index = self.vram[map_base + tile_row * 32 + tile_col];
            let (lo, hi) = self.tile_row(tile_index, tile_y);
            let bit = 7 - window_x % 8;
            let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
            self.line_color_zero[x] = color_id == 0;
            self.put_pixel(x, Self::dmg_shade(self.bgp, color_id));
        }
        // The window consumed a line; its internal counter only advances on
        // lines where it was actually drawn.
        self.win_line_counter = self.win_line_counter.wrapping_add(1);
    }

    fn render_sprites(&mut self) {
        let sprite_height: i16 = if self.lcdc & 0x04 != 0 { 16 } else { 8 };
        let mut drawn = [false; SCREEN_WIDTH];
        for i in 0..self.sprite_count {
            let s = self.line_sprites[i];
            let mut tile = s.tile;
            if sprite_height == 16 {
                tile &= 0xFE;
            }
            let mut line_idx = self.ly as i16 - s.y;
            if s.flags & 0x40 != 0 {
                line_idx = sprite_height - 1 - line_idx;
            }
            let obp = if s.flags & 0x10 != 0 { self.obp1 } else { self.obp0 };
            let tile = tile.wrapping_add((line_idx >> 3) as u8);
            let row = (line_idx & 7) as usize;
            let lo = self.vram[tile as usize * 16 + row * 2];
            let hi = self.vram[tile as usize * 16 + row * 2 + 1];
            for px in 0..8 {
                let bit = if s.flags & 0x20 != 0 { px } else { 7 - px };
                let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
                if color_id == 0 {
                    continue; // transparent
                }
                let sx = s.x + px as i16;
                if !(0i16..SCREEN_WIDTH as i16).contains(&sx) || drawn[sx as usize] {
                    continue;
                }
                // Behind-background flag: only color 0 shows through.
                if s.flags & 0x80 != 0 && !self.line_color_zero[sx as usize] {
                    continue;
                }
                self.put_pixel(sx as usize, Self::dmg_shade(obp, color_id));
                drawn[sx as usize] = true;
            }
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
