//! CPU clocks and clock-domain conversion.

/// Per-instance CPU cycle counter.
///
/// 32 bits wide; the owner rebases it (and everything scheduled against it)
/// before it reaches [`PREVENT_OVERFLOW_TICK`].
pub type Clock = u32;

/// Largest representable clock value. Used as "never" by the alarm queue.
pub const CLOCK_MAX: Clock = Clock::MAX;

/// Clock value at which a rebase becomes due.
pub const PREVENT_OVERFLOW_TICK: Clock = CLOCK_MAX - 0x10_0000;

/// Crystal configuration of one clock domain.
///
/// The drive CPUs and the main CPU each run from their own crystal; the
/// ratio between two of these is what a [`SyncFactor`] encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MasterClock {
    /// CPU frequency in Hz (e.g. `985_248` for a PAL C64).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }
}

/// Precomputed ratio table converting elapsed cycles of one clock domain
/// into cycles of another.
///
/// The factor is a 16.16 fixed-point ratio. Conversions are looked up in
/// chunks of at most [`SyncFactor::MAX_TICKS`] cycles; the fractional part
/// of each chunk is returned separately so the caller can accumulate it.
#[derive(Debug, Clone)]
pub struct SyncFactor {
    factor: u32,
    whole: Box<[Clock]>,
    fraction: Box<[u32]>,
}

impl SyncFactor {
    /// Largest chunk the table covers.
    pub const MAX_TICKS: Clock = 0x1000;

    /// One whole attached cycle, in accumulator units.
    pub const ONE: u32 = 0x1_0000;

    /// Build the table for a 16.16 fixed-point factor.
    #[must_use]
    pub fn new(factor: u32) -> Self {
        let entries = Self::MAX_TICKS as usize + 1;
        let mut whole = Vec::with_capacity(entries);
        let mut fraction = Vec::with_capacity(entries);
        for ticks in 0..=u64::from(Self::MAX_TICKS) {
            let scaled = ticks * u64::from(factor);
            whole.push((scaled / u64::from(Self::ONE)) as Clock);
            fraction.push((scaled % u64::from(Self::ONE)) as u32);
        }
        Self {
            factor,
            whole: whole.into_boxed_slice(),
            fraction: fraction.into_boxed_slice(),
        }
    }

    /// Factor converting `main` cycles into `attached` cycles.
    #[must_use]
    pub fn from_clocks(attached: MasterClock, main: MasterClock) -> Self {
        let factor = (attached.frequency_hz << 16) / main.frequency_hz.max(1);
        Self::new(factor.min(u64::from(u32::MAX)) as u32)
    }

    /// The raw 16.16 factor.
    #[must_use]
    pub fn factor(&self) -> u32 {
        self.factor
    }

    /// Attached cycles for `ticks` main cycles, as (whole, fraction).
    ///
    /// `ticks` is clamped to [`SyncFactor::MAX_TICKS`].
    #[must_use]
    pub fn lookup(&self, ticks: Clock) -> (Clock, u32) {
        let index = ticks.min(Self::MAX_TICKS) as usize;
        (self.whole[index], self.fraction[index])
    }
}
