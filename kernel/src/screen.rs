use core::sync::atomic::Ordering;

use crate::error::{ConsoleError, Result};
use crate::param::{HIGHLIGHT_ATTR, NORMAL_ATTR, SCREEN_CELLS, SCREEN_COLS, SCREEN_ROWS};
use crate::serial::SerialSink;

// Doesn't fit in a u8, so it can't collide with a real byte passed to put().
pub const BACKSPACE: u16 = 0x100;

pub trait CrtPort {
    fn write_cell(&mut self, index: usize, cell: u16);
    fn read_cell(&self, index: usize) -> u16;
    fn set_hw_cursor(&mut self, pos: usize);
    fn scroll_up_one_row(&mut self);
}

#[derive(Debug)]
pub struct MemoryCrt {
    cells: [u16; SCREEN_CELLS],
    cursor: usize,
}

impl Default for MemoryCrt {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCrt {
    pub const fn new() -> Self {
        MemoryCrt {
            cells: [((NORMAL_ATTR as u16) << 8) | (b' ' as u16); SCREEN_CELLS],
            cursor: 0,
        }
    }

    pub fn cells(&self) -> &[u16; SCREEN_CELLS] {
        &self.cells
    }
}

impl CrtPort for MemoryCrt {
    fn write_cell(&mut self, index: usize, cell: u16) {
        self.cells[index] = cell;
    }

    fn read_cell(&self, index: usize) -> u16 {
        self.cells[index]
    }

    fn set_hw_cursor(&mut self, pos: usize) {
        self.cursor = pos;
    }

    fn scroll_up_one_row(&mut self) {
        // Rows 1..23 move up one, row 23 is cleared, row 24 is left as-is.
        self.cells
            .copy_within(SCREEN_COLS..SCREEN_COLS * (SCREEN_ROWS - 1), 0);
        let blank = ((NORMAL_ATTR as u16) << 8) | (b' ' as u16);
        let row23 = SCREEN_COLS * (SCREEN_ROWS - 2);
        for cell in &mut self.cells[row23..row23 + SCREEN_COLS] {
            *cell = blank;
        }
    }
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub struct HardwareCrt {
    cells: *mut volatile::Volatile<u16>,
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
impl HardwareCrt {
    // `base` must point at SCREEN_CELLS contiguous u16 cells, mapped
    // writable and uncached, for the lifetime of this value.
    pub unsafe fn new(base: *mut u16) -> Self {
        HardwareCrt {
            cells: base as *mut volatile::Volatile<u16>,
        }
    }
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
impl CrtPort for HardwareCrt {
    fn write_cell(&mut self, index: usize, cell: u16) {
        unsafe { (*self.cells.add(index)).write(cell) };
    }

    fn read_cell(&self, index: usize) -> u16 {
        unsafe { (*self.cells.add(index)).read() }
    }

    fn set_hw_cursor(&mut self, pos: usize) {
        use crate::arch::outb;
        use crate::param::{CRT_CURSOR_HI, CRT_CURSOR_LO, CRT_DATA_PORT, CRT_INDEX_PORT};
        unsafe {
            outb(CRT_INDEX_PORT, CRT_CURSOR_HI);
            outb(CRT_DATA_PORT, (pos >> 8) as u8);
            outb(CRT_INDEX_PORT, CRT_CURSOR_LO);
            outb(CRT_DATA_PORT, (pos & 0xff) as u8);
        }
    }

    fn scroll_up_one_row(&mut self) {
        for i in 0..SCREEN_COLS * (SCREEN_ROWS - 2) {
            let moved = self.read_cell(i + SCREEN_COLS);
            self.write_cell(i, moved);
        }
        let blank = ((NORMAL_ATTR as u16) << 8) | (b' ' as u16);
        let row23 = SCREEN_COLS * (SCREEN_ROWS - 2);
        for i in row23..row23 + SCREEN_COLS {
            self.write_cell(i, blank);
        }
    }
}

pub struct Screen<C: CrtPort, S: SerialSink> {
    backend: C,
    serial: S,
    pos: usize,
}

impl<C: CrtPort, S: SerialSink> Screen<C, S> {
    pub const fn new(backend: C, serial: S) -> Self {
        Screen {
            backend,
            serial,
            pos: 0,
        }
    }

    pub fn get_cursor(&self) -> usize {
        self.pos
    }

    pub fn set_cursor(&mut self, pos: usize) {
        self.pos = pos;
        self.backend.set_hw_cursor(pos);
    }

    pub fn scroll_up_one_row(&mut self) {
        self.backend.scroll_up_one_row();
    }

    // CursorOutOfBounds is a fatal invariant violation; callers expect()
    // this away rather than try to recover from it.
    pub fn put(&mut self, byte: u16) -> Result<()> {
        if crate::PANICKED.load(Ordering::Acquire) {
            loop {
                core::hint::spin_loop();
            }
        }

        match byte {
            0x0a => {
                self.pos += SCREEN_COLS - self.pos % SCREEN_COLS;
                self.serial.put(b'\n');
            }
            BACKSPACE => {
                if self.pos > 0 {
                    self.pos -= 1;
                }
                self.serial.put(0x08);
                self.serial.put(b' ');
                self.serial.put(0x08);
            }
            _ => {
                let glyph = (byte & 0xff) as u8;
                self.backend
                    .write_cell(self.pos, ((NORMAL_ATTR as u16) << 8) | glyph as u16);
                self.pos += 1;
                self.serial.put(glyph);
            }
        }

        if self.pos / SCREEN_COLS >= SCREEN_ROWS - 1 {
            self.scroll_up_one_row();
            self.pos -= SCREEN_COLS;
        }

        if byte == BACKSPACE {
            let blank = ((NORMAL_ATTR as u16) << 8) | (b' ' as u16);
            self.backend.write_cell(self.pos, blank);
        }

        if self.pos > SCREEN_CELLS {
            return Err(ConsoleError::CursorOutOfBounds);
        }

        self.backend.set_hw_cursor(self.pos);
        Ok(())
    }

    // Cells outside [0, SCREEN_CELLS) are skipped, not an error.
    pub fn highlight_range(&mut self, start_cell: isize, end_cell: isize, on: bool) {
        let attr = if on { HIGHLIGHT_ATTR } else { NORMAL_ATTR };
        for i in start_cell..end_cell {
            if i < 0 || i as usize >= SCREEN_CELLS {
                continue;
            }
            let i = i as usize;
            let glyph = self.backend.read_cell(i) & 0xff;
            self.backend.write_cell(i, ((attr as u16) << 8) | glyph);
        }
    }
}
