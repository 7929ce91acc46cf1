//! Driver error taxonomy.

/// Errors returned by VDMA channel and engine operations.
///
/// Every check that can produce one of these runs before the first register
/// write of the operation, so a failed call leaves the hardware untouched
/// (scatter-gather geometry is validated for the whole ring up front).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VdmaError {
    /// A caller-supplied value is outside its documented hardware range.
    InvalidParam,
    /// Scatter-gather hardware is mid-transfer; stop or wait first.
    DeviceBusy,
    /// The requested direction is not present in this hardware build.
    DeviceNotFound,
    /// Generic failure: reset timeout, uninitialized channel, or an option the
    /// build does not support for this request.
    Failure,
    /// A debug register (threshold, frame store, frame or delay counter) was
    /// left out of this hardware build.
    NoFeature,
    /// Run was commanded but the channel never reported running.
    DmaError,
}

impl VdmaError {
    /// Numeric status word published to the host through the mailbox.
    ///
    /// Zero is reserved for success.
    pub const fn status_code(self) -> u32 {
        match self {
            Self::Failure => 1,
            Self::DeviceNotFound => 2,
            Self::InvalidParam => 15,
            Self::NoFeature => 19,
            Self::DeviceBusy => 21,
            Self::DmaError => 1001,
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VdmaError {}

impl core::fmt::Display for VdmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidParam => write!(f, "VDMA parameter out of range"),
            Self::DeviceBusy => write!(f, "VDMA channel is busy"),
            Self::DeviceNotFound => write!(f, "VDMA channel not present"),
            Self::Failure => write!(f, "VDMA operation failed"),
            Self::NoFeature => write!(f, "VDMA feature not built into hardware"),
            Self::DmaError => write!(f, "VDMA channel failed to start"),
        }
    }
}
