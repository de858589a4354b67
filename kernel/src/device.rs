use crate::console::ConsoleState;
use crate::error::{ConsoleError, Result};
use crate::linebuf::EOF_BYTE;
use crate::scheduler::Scheduler;
use crate::screen::CrtPort;
use crate::serial::SerialSink;
use crate::spinlock::{InterruptControl, SpinMutex};

// Released before the console lock is acquired, reacquired just before
// returning. A real kernel's inode lock type implements this instead of
// NoInodeLock.
pub trait InodeLock {
    fn unlock(&self);
    fn relock(&self);
}

pub struct NoInodeLock;

impl InodeLock for NoInodeLock {
    fn unlock(&self) {}
    fn relock(&self) {}
}

pub trait CharDevice {
    fn read(&self, lock: &dyn InodeLock, dst: &mut [u8]) -> Result<usize>;
    fn write(&self, src: &[u8]) -> Result<usize>;
}

pub const CONSOLE_MAJOR: u32 = 1;

pub trait DeviceSwitch {
    fn bind(&self, major: u32, device: &dyn CharDevice);
}

pub struct DeviceIo<'a, C, S, I, Sch>
where
    C: CrtPort,
    S: SerialSink,
    I: InterruptControl,
    Sch: Scheduler,
{
    console: &'a SpinMutex<ConsoleState<C, S>, I>,
    scheduler: &'a Sch,
}

impl<'a, C, S, I, Sch> DeviceIo<'a, C, S, I, Sch>
where
    C: CrtPort,
    S: SerialSink,
    I: InterruptControl,
    Sch: Scheduler,
{
    pub const fn new(console: &'a SpinMutex<ConsoleState<C, S>, I>, scheduler: &'a Sch) -> Self {
        DeviceIo { console, scheduler }
    }

    // Blocks until dst is full, a newline is copied, or EOF is hit.
    pub fn read(&self, lock: &dyn InodeLock, dst: &mut [u8]) -> Result<usize> {
        lock.unlock();

        self.console.acquire();
        // Held until the matching raw release below; mirrors Scheduler::sleep's
        // contract of handing the lock back across a blocking wait.
        let state = unsafe { self.console.assume_locked() };

        let target = dst.len();
        let mut n = target;
        let outcome: Result<()> = 'outer: loop {
            if n == 0 {
                break Ok(());
            }
            let chan = state.read_chan();
            while !state.line.has_committed_bytes() {
                self.scheduler.sleep(chan, self.console);
                if self.scheduler.current_is_killed() {
                    break 'outer Err(ConsoleError::Killed);
                }
            }
            let byte = state
                .line
                .read_byte_into()
                .expect("woke with committed bytes available");
            if byte == EOF_BYTE {
                if n < target {
                    // Bytes were already copied this call; retain the EOF
                    // for the next read instead of consuming it here.
                    state.line.retain_last_read();
                }
                break Ok(());
            }
            dst[target - n] = byte;
            n -= 1;
            if byte == b'\n' {
                break Ok(());
            }
        };

        unsafe { self.console.release() };
        lock.relock();

        outcome.map(|()| target - n)
    }

    pub fn write(&self, src: &[u8]) -> Result<usize> {
        let mut state = self.console.lock();
        for &byte in src {
            state.screen.put((byte & 0xff) as u16)?;
        }
        Ok(src.len())
    }

    pub fn init(&self, switch: &impl DeviceSwitch, enable_keyboard_irq: impl FnOnce())
    where
        Self: CharDevice,
    {
        switch.bind(CONSOLE_MAJOR, self);
        enable_keyboard_irq();
    }
}

impl<'a, C, S, I, Sch> CharDevice for DeviceIo<'a, C, S, I, Sch>
where
    C: CrtPort,
    S: SerialSink,
    I: InterruptControl,
    Sch: Scheduler,
{
    fn read(&self, lock: &dyn InodeLock, dst: &mut [u8]) -> Result<usize> {
        DeviceIo::read(self, lock, dst)
    }

    fn write(&self, src: &[u8]) -> Result<usize> {
        DeviceIo::write(self, src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::consoleintr;
    use crate::console::NoDiagnostics;
    use crate::scheduler::CondvarScheduler;
    use crate::screen::MemoryCrt;
    use crate::serial::RecordingSerial;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    type TestConsole = SpinMutex<ConsoleState<MemoryCrt, RecordingSerial>>;

    fn console() -> Arc<TestConsole> {
        Arc::new(SpinMutex::new(
            "cons",
            ConsoleState::new(MemoryCrt::new(), RecordingSerial::default()),
        ))
    }

    #[test]
    fn read_returns_a_committed_line() {
        let console = console();
        let sched = CondvarScheduler::new();
        let mut codes = b"hello\n".iter().copied();
        consoleintr(&*console, &sched, &NoDiagnostics, || codes.next());

        let io = DeviceIo::new(&console, &sched);
        let mut dst = [0u8; 16];
        let n = io.read(&NoInodeLock, &mut dst).unwrap();
        assert_eq!(n, 6);
        assert_eq!(&dst[..6], b"hello\n");
    }

    #[test]
    fn empty_line_ctrl_d_reads_as_eof_alone() {
        let console = console();
        let sched = CondvarScheduler::new();
        let mut codes = [crate::editor::CTLD].into_iter();
        consoleintr(&*console, &sched, &NoDiagnostics, || codes.next());

        let io = DeviceIo::new(&console, &sched);
        let mut dst = [0u8; 16];
        let n = io.read(&NoInodeLock, &mut dst).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn mid_line_eof_is_retained_for_the_next_read() {
        let console = console();
        let sched = CondvarScheduler::new();
        let mut codes = [b'a', b'b', crate::editor::CTLD].into_iter();
        consoleintr(&*console, &sched, &NoDiagnostics, || codes.next());

        let io = DeviceIo::new(&console, &sched);
        let mut dst = [0u8; 16];
        let n = io.read(&NoInodeLock, &mut dst).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&dst[..2], b"ab");

        let n2 = io.read(&NoInodeLock, &mut dst).unwrap();
        assert_eq!(n2, 0);
    }

    #[test]
    fn read_blocks_until_a_line_is_committed_from_another_thread() {
        let console = console();
        let sched = Arc::new(CondvarScheduler::new());

        let console2 = Arc::clone(&console);
        let sched2 = Arc::clone(&sched);
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let mut codes = b"ok\n".iter().copied();
            consoleintr(&*console2, &*sched2, &NoDiagnostics, || codes.next());
        });

        let io = DeviceIo::new(&console, &*sched);
        let mut dst = [0u8; 16];
        let n = io.read(&NoInodeLock, &mut dst).unwrap();
        assert_eq!(&dst[..n], b"ok\n");
        writer.join().unwrap();
    }

    #[test]
    fn killed_reader_returns_without_consuming_bytes() {
        let console = console();
        let sched = Arc::new(CondvarScheduler::new());

        let sched2 = Arc::clone(&sched);
        let killer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sched2.kill();
        });

        let io = DeviceIo::new(&console, &*sched);
        let mut dst = [0u8; 16];
        assert_eq!(io.read(&NoInodeLock, &mut dst), Err(ConsoleError::Killed));
        killer.join().unwrap();
    }

    #[test]
    fn write_renders_every_byte_and_returns_its_length() {
        let console = console();
        let sched = CondvarScheduler::new();
        let io = DeviceIo::new(&console, &sched);
        let n = io.write(b"hi").unwrap();
        assert_eq!(n, 2);
        assert_eq!(console.lock().screen.get_cursor(), 2);
    }
}
