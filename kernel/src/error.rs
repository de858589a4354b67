use core::fmt;

// Transient input-shape errors (Tab on a non-first word, paste from an empty
// clipboard, undo with an empty log, ...) are silently ignored by the
// dispatcher and never reach this type; this is only for cases a caller
// outside the interrupt handler needs to match on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConsoleError {
    Overflow,
    Underflow,
    Killed,
    // Cursor left the framebuffer: fatal, see crate::PANICKED.
    CursorOutOfBounds,
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConsoleError::Overflow => "console overflow",
            ConsoleError::Underflow => "console underflow",
            ConsoleError::Killed => "killed",
            ConsoleError::CursorOutOfBounds => "cursor out of framebuffer bounds",
        };
        f.write_str(msg)
    }
}

pub type Result<T> = core::result::Result<T, ConsoleError>;
