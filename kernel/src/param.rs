#![allow(dead_code)]

use static_assertions::const_assert;

pub const BUFSIZE: usize = 128;
pub const CLIPSIZE: usize = 128;
pub const UNDOSIZE: usize = 128;

pub const SCREEN_ROWS: usize = 25;
pub const SCREEN_COLS: usize = 80;
pub const SCREEN_CELLS: usize = SCREEN_ROWS * SCREEN_COLS;

pub const NORMAL_ATTR: u8 = 0x07;
pub const HIGHLIGHT_ATTR: u8 = 0x70;

// CRT index/data port pair and cursor register indices.
pub const CRT_INDEX_PORT: u16 = 0x3d4;
pub const CRT_DATA_PORT: u16 = 0x3d5;
pub const CRT_CURSOR_HI: u8 = 14;
pub const CRT_CURSOR_LO: u8 = 15;

const_assert!(BUFSIZE.is_power_of_two());
const_assert!(CLIPSIZE <= BUFSIZE);
const_assert!(SCREEN_CELLS <= u16::MAX as usize);
