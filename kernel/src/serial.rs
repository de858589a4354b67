use bitflags::bitflags;

bitflags! {
    struct LineStatus: u8 {
        const RX_READY = 0x01;
        const TX_READY = 0x20;
    }
}

pub trait SerialSink {
    fn put(&mut self, byte: u8);
}

pub struct NullSerial;

impl SerialSink for NullSerial {
    fn put(&mut self, _byte: u8) {}
}

#[cfg(any(test, feature = "std"))]
#[derive(Default)]
pub struct RecordingSerial {
    pub bytes: std::vec::Vec<u8>,
}

#[cfg(any(test, feature = "std"))]
impl SerialSink for RecordingSerial {
    fn put(&mut self, byte: u8) {
        self.bytes.push(byte);
    }
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub struct Uart16550 {
    port: u16,
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
impl Uart16550 {
    const COM1: u16 = 0x3f8;

    // Caller must ensure no other code touches the COM1 ports concurrently.
    pub unsafe fn new() -> Self {
        Uart16550 { port: Self::COM1 }
    }

    fn line_status(&self) -> LineStatus {
        LineStatus::from_bits_truncate(unsafe { crate::arch::inb(self.port + 5) })
    }

    fn tx_ready(&self) -> bool {
        self.line_status().contains(LineStatus::TX_READY)
    }
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
impl SerialSink for Uart16550 {
    fn put(&mut self, byte: u8) {
        while !self.tx_ready() {
            core::hint::spin_loop();
        }
        unsafe { crate::arch::outb(self.port, byte) };
    }
}
