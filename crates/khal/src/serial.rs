//! COM1 (16550 UART) output for kernel diagnostics.
//!
//! Polled, transmit-only. The port sits behind a `spin::Mutex` taken with
//! interrupts disabled, so an interrupt handler that logs cannot deadlock
//! against the code it interrupted.

use core::fmt;

use spin::Mutex;
use x86_64::instructions::interrupts;
use x86_64::instructions::port::Port;

/// COM1 base port address
const COM1_PORT: u16 = 0x3F8;

/// Line status register: transmit holding register empty.
const LSR_THR_EMPTY: u8 = 0x20;

/// A 16550 UART at a fixed base port.
pub struct Serial {
    base: u16,
    initialized: bool,
}

impl Serial {
    const fn new(base: u16) -> Self {
        Self {
            base,
            initialized: false,
        }
    }

    fn reg(&self, offset: u16) -> Port<u8> {
        Port::new(self.base + offset)
    }

    /// 115200 baud, 8N1, FIFOs on, UART interrupts off.
    pub fn init(&mut self) {
        // SAFETY: the registers of a 16550 at `base`, programmed in the
        // documented order.
        unsafe {
            self.reg(1).write(0x00); // IER: no interrupts
            self.reg(3).write(0x80); // LCR: DLAB on
            self.reg(0).write(0x01); // divisor low: 115200
            self.reg(1).write(0x00); // divisor high
            self.reg(3).write(0x03); // LCR: 8N1, DLAB off
            self.reg(2).write(0xC7); // FCR: enable + clear, 14-byte threshold
            self.reg(4).write(0x0B); // MCR: DTR, RTS, OUT2
        }
        self.initialized = true;
    }

    /// Write a byte to the serial port
    pub fn write_byte(&mut self, byte: u8) {
        if !self.initialized {
            return;
        }

        // SAFETY: reading LSR and writing THR have no effect beyond the UART.
        unsafe {
            while self.reg(5).read() & LSR_THR_EMPTY == 0 {
                core::hint::spin_loop();
            }
            self.reg(0).write(byte);
        }
    }
}

impl fmt::Write for Serial {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
        Ok(())
    }
}

/// Global serial port instance (COM1)
static SERIAL: Mutex<Serial> = Mutex::new(Serial::new(COM1_PORT));

/// Initialize the global serial port
pub fn init() {
    interrupts::without_interrupts(|| SERIAL.lock().init());
}

/// Write formatted arguments to the serial port
pub fn write_fmt(args: fmt::Arguments) {
    use fmt::Write;
    interrupts::without_interrupts(|| {
        // Serial::write_str never fails.
        let _ = SERIAL.lock().write_fmt(args);
    });
}

/// Writes without waiting for the port lock.
///
/// For the fatal path only: the core that failed may be the one holding the
/// port lock. Output can interleave with another core's line.
pub fn write_fmt_unlocked(args: fmt::Arguments) {
    use fmt::Write;
    let mut port = Serial::new(COM1_PORT);
    port.initialized = true;
    let _ = port.write_fmt(args);
}
