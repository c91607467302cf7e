//! CPU core trait.

/// A CPU core driven by a host.
///
/// The host `H` owns the bus, the clock and the interrupt lines; the CPU
/// owns only its register file and per-instruction bookkeeping. Several CPUs
/// can therefore share one engine type while each talks to its own host.
pub trait Cpu<H: ?Sized> {
    /// The type used for register inspection.
    type Registers;

    /// Execute exactly one instruction, including any interrupt dispatch that
    /// precedes it.
    fn step(&mut self, host: &mut H);

    /// Reset the CPU: reinitialize flags, stack and PC from the reset vector.
    fn reset(&mut self, host: &mut H);

    /// Returns the current program counter.
    ///
    /// Returns `u32` so the 65816's 24-bit PC fits; 16-bit CPUs zero-extend.
    fn pc(&self) -> u32;

    /// Returns a copy of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true while the CPU is jammed or stopped.
    fn is_halted(&self) -> bool;
}
