use bitflags::bitflags;

const NO: u8 = 0;

// One byte above any PS/2 make code, disjoint from ASCII and the editor's
// control-code range.
pub const HOME: u8 = 0xE0;
pub const END: u8 = 0xE1;
pub const UP: u8 = 0xE2;
pub const DOWN: u8 = 0xE3;
pub const LEFT: u8 = 0xE4;
pub const RIGHT: u8 = 0xE5;
pub const PGUP: u8 = 0xE6;
pub const PGDN: u8 = 0xE7;
pub const INS: u8 = 0xE8;
pub const DEL: u8 = 0xE9;

pub const KEY_LF: u8 = LEFT;
pub const KEY_RT: u8 = RIGHT;

bitflags! {
    struct Status: u8 {
        const DATA_AVAIL = 1;
    }
}

bitflags! {
    #[derive(Default)]
    struct Modifiers: u8 {
        const SHIFT = 1;
        const CTL = 1 << 1;
        const ALT = 1 << 2;
        const CAPSLOCK = 1 << 3;
        const NUMLOCK = 1 << 4;
        const SCROLLLOCK = 1 << 5;
        const E0ESC = 1 << 6;
    }
}

fn shift_code(b: u8) -> Modifiers {
    match b {
        0x1D | 0x9D => Modifiers::CTL,
        0x2A | 0x36 => Modifiers::SHIFT,
        0x38 | 0xB8 => Modifiers::ALT,
        _ => Modifiers::empty(),
    }
}

fn toggle_code(b: u8) -> Modifiers {
    match b {
        0x3A => Modifiers::CAPSLOCK,
        0x45 => Modifiers::NUMLOCK,
        0x46 => Modifiers::SCROLLLOCK,
        _ => Modifiers::empty(),
    }
}

const fn c(b: u8) -> u8 {
    b - b'@'
}

#[rustfmt::skip]
const NORMAL_MAP: [u8; 256] = [
    NO,      0x1B,    b'1',    b'2',    b'3',    b'4',    b'5',    b'6', // 0x00
    b'7',    b'8',    b'9',    b'0',    b'-',    b'=',    b'\x07', b'\t',
    b'q',    b'w',    b'e',    b'r',    b't',    b'y',    b'u',    b'i', // 0x10
    b'o',    b'p',    b'[',    b']',    b'\n',   NO,      b'a',    b's',
    b'd',    b'f',    b'g',    b'h',    b'j',    b'k',    b'l',    b';', // 0x20
    b'\'',   b'`',    NO,      b'\\',   b'z',    b'x',    b'c',    b'v',
    b'b',    b'n',    b'm',    b',',    b'.',    b'/',    NO,      b'*', // 0x30
    NO,      b' ',    NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      b'7', // 0x40
    b'8',    b'9',    b'-',    b'4',    b'5',    b'6',    b'+',    b'1',
    b'2',    b'3',    b'0',    b'.',    NO,      NO,      NO,      NO,   // 0x50
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0x60
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0x70
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      b'/',    NO,      NO,   // 0x80
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0x90
    NO,      NO,      NO,      NO,      b'\n',   NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xa0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xb0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      HOME, // 0xc0
    UP,      PGUP,    NO,      LEFT,    NO,      RIGHT,   NO,      END,
    DOWN,    PGDN,    INS,     DEL,     NO,      NO,      NO,      NO,   // 0xd0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xe0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xf0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
];

#[rustfmt::skip]
const SHIFT_MAP: [u8; 256] = [
    NO,      0x1B,    b'!',    b'@',    b'#',    b'$',    b'%',    b'^',  // 0x00
    b'&',    b'*',    b'(',    b')',    b'_',    b'+',    b'\x07', b'\t',
    b'Q',    b'W',    b'E',    b'R',    b'T',    b'Y',    b'U',    b'I',  // 0x10
    b'O',    b'P',    b'{',    b'}',    b'\n',   NO,      b'A',    b'S',
    b'D',    b'F',    b'G',    b'H',    b'J',    b'K',    b'L',    b':',  // 0x20
    b'"',    b'~',    NO,      b'|',    b'Z',    b'X',    b'C',    b'V',
    b'B',    b'N',    b'M',    b'<',    b'>',    b'?',    NO,      b'*',  // 0x30
    NO,      b' ',    NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      b'7',  // 0x40
    b'8',    b'9',    b'-',    b'4',    b'5',    b'6',    b'+',    b'1',
    b'2',    b'3',    b'0',    b'.',    NO,      NO,      NO,      NO,   // 0x50
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0x60
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0x70
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      b'/',    NO,      NO,   // 0x80
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0x90
    NO,      NO,      NO,      NO,      b'\n',   NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xa0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xb0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      HOME, // 0xc0
    UP,      PGUP,    NO,      LEFT,    NO,      RIGHT,   NO,      END,
    DOWN,    PGDN,    INS,     DEL,     NO,      NO,      NO,      NO,   // 0xd0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xe0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xf0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
];

#[rustfmt::skip]
const CTL_MAP: [u8; 256] = [
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0x00
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    c(b'Q'), c(b'W'), c(b'E'), c(b'R'), c(b'T'), c(b'Y'), c(b'U'), c(b'I'), // 0x10
    c(b'O'), c(b'P'), NO,      NO,      b'\r',   NO,      c(b'A'), c(b'S'),
    c(b'D'), c(b'F'), c(b'G'), c(b'H'), c(b'J'), c(b'K'), c(b'L'), NO,   // 0x20
    NO,      NO,      NO,      c(b'\\'),c(b'Z'), c(b'X'), c(b'C'), c(b'V'),
    c(b'B'), c(b'N'), c(b'M'), NO,      NO,      b'/',    NO,      NO,   // 0x30
    NO,      b' ',    NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      b'7', // 0x40
    b'8',    b'9',    b'-',    b'4',    b'5',    b'6',    b'+',    b'1',
    b'2',    b'3',    b'0',    b'.',    NO,      NO,      NO,      NO,   // 0x50
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0x60
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0x70
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      b'/',    NO,      NO,   // 0x80
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0x90
    NO,      NO,      NO,      NO,      b'\r',   NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xa0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xb0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      HOME, // 0xc0
    UP,      PGUP,    NO,      LEFT,    NO,      RIGHT,   NO,      END,
    DOWN,    PGDN,    INS,     DEL,     NO,      NO,      NO,      NO,   // 0xd0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xe0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,   // 0xf0
    NO,      NO,      NO,      NO,      NO,      NO,      NO,      NO,
];

const STATUS_PORT: u16 = 0x64;
const DATA_PORT: u16 = 0x60;

#[derive(Default)]
pub struct Keyboard {
    mods: Modifiers,
}

impl Keyboard {
    pub const fn new() -> Self {
        Keyboard {
            mods: Modifiers::empty(),
        }
    }

    pub fn decode(&mut self, mut data: u8) -> Option<u8> {
        if data == 0xE0 {
            self.mods.insert(Modifiers::E0ESC);
            return None;
        } else if (data & 0b1000_0000) != 0 {
            data = if self.mods.contains(Modifiers::E0ESC) {
                data
            } else {
                data & 0b0111_1111
            };
            self.mods.remove(Modifiers::E0ESC | shift_code(data));
            return None;
        } else if self.mods.contains(Modifiers::E0ESC) {
            data |= 0b1000_0000;
            self.mods.remove(Modifiers::E0ESC);
        }

        self.mods.insert(shift_code(data));
        self.mods.toggle(toggle_code(data));

        let map = if self.mods.contains(Modifiers::CTL) {
            &CTL_MAP
        } else if self.mods.contains(Modifiers::SHIFT) {
            &SHIFT_MAP
        } else {
            &NORMAL_MAP
        };
        let mut b = map[data as usize];
        if self.mods.contains(Modifiers::CAPSLOCK) {
            if b.is_ascii_lowercase() {
                b.make_ascii_uppercase();
            } else if b.is_ascii_uppercase() {
                b.make_ascii_lowercase();
            }
        }
        if b == NO {
            None
        } else {
            Some(b)
        }
    }
}

// Caller must ensure no other code touches ports 0x60/0x64 concurrently.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub unsafe fn read_scancode() -> Option<u8> {
    let status = Status::from_bits_truncate(unsafe { crate::arch::inb(STATUS_PORT) });
    if !status.contains(Status::DATA_AVAIL) {
        return None;
    }
    Some(unsafe { crate::arch::inb(DATA_PORT) })
}

// EOI to the interrupt controller is the embedding kernel's job, not ours.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub fn interrupt<C, S, I, Sch, D>(
    kbd: &mut Keyboard,
    console: &crate::spinlock::SpinMutex<crate::console::ConsoleState<C, S>, I>,
    scheduler: &Sch,
    diagnostics: &D,
) where
    C: crate::screen::CrtPort,
    S: crate::serial::SerialSink,
    I: crate::spinlock::InterruptControl,
    Sch: crate::scheduler::Scheduler,
    D: crate::console::Diagnostics,
{
    crate::console::consoleintr(console, scheduler, diagnostics, move || -> Option<u8> {
        loop {
            let raw = unsafe { read_scancode() }?;
            if let Some(b) = kbd.decode(raw) {
                return Some(b);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_letter_make_code_decodes() {
        let mut kbd = Keyboard::new();
        assert_eq!(kbd.decode(0x1E), Some(b'a')); // 'a' make code
    }

    #[test]
    fn break_code_produces_nothing() {
        let mut kbd = Keyboard::new();
        assert_eq!(kbd.decode(0x1E | 0x80), None);
    }

    #[test]
    fn shift_held_uppercases_letters() {
        let mut kbd = Keyboard::new();
        assert_eq!(kbd.decode(0x2A), None); // left shift make
        assert_eq!(kbd.decode(0x1E), Some(b'A'));
    }

    #[test]
    fn ctrl_held_produces_control_code() {
        let mut kbd = Keyboard::new();
        assert_eq!(kbd.decode(0x1D), None); // left ctrl make
        assert_eq!(kbd.decode(0x2E), Some(crate::editor::ctrl(b'C'))); // 'c' make code under CTL_MAP
    }

    #[test]
    fn e0_prefixed_arrow_key_decodes_to_sentinel() {
        let mut kbd = Keyboard::new();
        assert_eq!(kbd.decode(0xE0), None);
        assert_eq!(kbd.decode(0x4B), Some(LEFT));
    }
}
