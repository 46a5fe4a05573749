//! Bit-cell encoder: turns one logical slot of the bus (start condition, control
//! bit, data bit, stop condition) into its fixed template of line samples.
//!
//! Data only moves while the clock is low and the clock only rises once data is
//! settled. Start and stop conditions are the two places where data changes
//! under a high clock, which is how the bus marks frame boundaries.
use crate::core::Sample;

/// Longest template (stop condition).
pub const MAX_CELL_SAMPLES: usize = 4;

/// Template family of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CellKind {
    /// (1,1) → (1,0): data falls while the clock is high.
    Start,
    /// (0,hold) → (1,hold): one clock pulse, data untouched.
    Control,
    /// (0,hold) → (0,bit) → (1,bit): hold the previous level for one sample, then set up.
    Data,
    /// (0,hold) → (0,0) → (1,0) → (1,1): data rises while the clock is high.
    Stop,
}

impl CellKind {
    /// Number of samples the template occupies.
    pub const fn sample_count(self) -> usize {
        match self {
            Self::Start | Self::Control => 2,
            Self::Data => 3,
            Self::Stop => 4,
        }
    }
}

/// Samples produced for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    samples: [Sample; MAX_CELL_SAMPLES],
    len: usize,
}

impl Cell {
    #[inline]
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Last sample of the cell; the next cell holds its data level.
    #[inline]
    pub fn last(&self) -> Sample {
        self.samples[self.len - 1]
    }
}

/// Expand one slot.
///
/// * `kind` – template family
/// * `bit` – value of a data cell (ignored by the other kinds)
/// * `previous` – last sample already emitted; its data level is held where the template says so
/// * `trigger` – trigger level copied into every sample of the cell
pub fn encode_cell(kind: CellKind, bit: bool, previous: Sample, trigger: bool) -> Cell {
    let hold = previous.data;
    let mut samples = [Sample::default(); MAX_CELL_SAMPLES];

    match kind {
        CellKind::Start => {
            samples[0] = Sample::new(true, true);
            samples[1] = Sample::new(true, false);
        }
        CellKind::Control => {
            samples[0] = Sample::new(false, hold);
            samples[1] = Sample::new(true, hold);
        }
        CellKind::Data => {
            samples[0] = Sample::new(false, hold);
            samples[1] = Sample::new(false, bit);
            samples[2] = Sample::new(true, bit);
        }
        CellKind::Stop => {
            samples[0] = Sample::new(false, hold);
            samples[1] = Sample::new(false, false);
            samples[2] = Sample::new(true, false);
            samples[3] = Sample::new(true, true);
        }
    }

    let len = kind.sample_count();
    for sample in samples[..len].iter_mut() {
        sample.trigger = trigger;
    }

    Cell { samples, len }
}
