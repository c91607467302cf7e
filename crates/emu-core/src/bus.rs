//! Memory bus interface.

/// A linear region of the address space that can be fetched without side
/// effects.
///
/// CPUs cache the window covering the current PC and fetch opcodes and
/// operands through [`Bus::peek`] while the PC stays inside it. The cache is
/// dropped on every control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankWindow {
    /// First address inside the window.
    pub start: u32,
    /// Last address inside the window (inclusive).
    pub limit: u32,
}

impl BankWindow {
    #[must_use]
    pub const fn new(start: u32, limit: u32) -> Self {
        Self { start, limit }
    }

    /// True if `len` bytes starting at `address` all lie inside the window.
    #[must_use]
    pub const fn contains(&self, address: u32, len: u32) -> bool {
        address >= self.start && (address as u64) + (len as u64) <= (self.limit as u64) + 1
    }
}

/// Memory bus interface.
///
/// The CPU reaches memory and peripherals only through this trait. Reads and
/// writes may have side effects (I/O registers); `peek` never does.
pub trait Bus {
    /// Read a byte, with full address decoding.
    fn read(&mut self, address: u32) -> u8;

    /// Write a byte, with full address decoding.
    fn write(&mut self, address: u32, value: u8);

    /// Read from the zero page.
    ///
    /// Hosts with a plain RAM zero page can bypass the full decoder here.
    fn read_zero(&mut self, address: u8) -> u8 {
        self.read(u32::from(address))
    }

    /// Write to the zero page.
    fn write_zero(&mut self, address: u8, value: u8) {
        self.write(u32::from(address), value);
    }

    /// The side-effect-free window containing `address`, if any.
    fn bank_window(&self, address: u32) -> Option<BankWindow> {
        let _ = address;
        None
    }

    /// Side-effect-free read. Only called for addresses inside a window
    /// returned by [`Bus::bank_window`].
    fn peek(&self, address: u32) -> u8 {
        let _ = address;
        0xFF
    }
}

/// Flat RAM bus, used for testing and as a building block.
///
/// The whole memory is one bank window, so instruction fetch takes the fast
/// path.
#[derive(Debug, Clone)]
pub struct SimpleBus {
    memory: Vec<u8>,
    mask: u32,
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleBus {
    /// 64 KB of zeroed RAM.
    #[must_use]
    pub fn new() -> Self {
        Self::with_address_bits(16)
    }

    /// Zeroed RAM covering `bits` address lines (24 for a 65816).
    #[must_use]
    pub fn with_address_bits(bits: u32) -> Self {
        let size = 1usize << bits;
        Self {
            memory: vec![0; size],
            mask: (size - 1) as u32,
        }
    }

    /// Copy `data` into memory starting at `address`, wrapping at the top.
    pub fn load(&mut self, address: u32, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            let addr = (address.wrapping_add(i as u32) & self.mask) as usize;
            self.memory[addr] = byte;
        }
    }

    /// Raw view of memory.
    #[must_use]
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u32) -> u8 {
        self.memory[(address & self.mask) as usize]
    }

    fn write(&mut self, address: u32, value: u8) {
        self.memory[(address & self.mask) as usize] = value;
    }

    fn bank_window(&self, _address: u32) -> Option<BankWindow> {
        Some(BankWindow::new(0, self.mask))
    }

    fn peek(&self, address: u32) -> u8 {
        self.memory[(address & self.mask) as usize]
    }
}
