//! The console device: keyboard interrupt in, line-edited byte stream out.
//! See `console` for the lock and the dispatch loop.
#![cfg_attr(not(any(test, feature = "std", feature = "cargo-clippy")), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod arch;
pub mod clipboard;
pub mod completer;
pub mod console;
pub mod device;
pub mod editor;
pub mod error;
pub mod keyboard;
pub mod linebuf;
pub mod param;
pub mod scheduler;
pub mod screen;
pub mod selection;
pub mod serial;
pub mod spinlock;
pub mod undo;

pub use error::{ConsoleError, Result};

// Set (never cleared) by the host's panic handler; screen::Screen::put spins
// once this is up, instead of racing a half-updated framebuffer.
pub static PANICKED: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(false);
