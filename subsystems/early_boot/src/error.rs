//! # Boot Errors
//!
//! Every failure the boot sequence can report. None of them is recoverable:
//! the sequencer prints the error and powers the machine off.

use core::fmt;

use crate::info::{CONFIG_BLOB_MAGIC, CONFIG_BLOB_MAX_SIZE, MAX_HARTS};

/// Result alias for boot operations
pub type BootResult<T> = Result<T, BootError>;

// =============================================================================
// VALIDATION ERRORS
// =============================================================================

/// Rejected firmware hand-off parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Hart id outside `0..MAX_HARTS`
    HartIdOutOfRange {
        /// Reported hart id
        hart_id: u64,
    },
    /// Configuration blob address is zero
    NullConfigBlob,
    /// Configuration blob address is not 4-byte aligned
    MisalignedConfigBlob {
        /// Reported address
        address: u64,
    },
    /// Header could not be read from the given address
    UnreadableConfigBlob {
        /// Reported address
        address: u64,
    },
    /// Header magic mismatch
    BadMagic {
        /// Decoded magic
        found: u32,
    },
    /// Declared blob size exceeds the supported maximum
    ConfigBlobTooLarge {
        /// Declared total size
        total_size: u32,
    },
    /// A block offset points past the end of the blob
    OffsetOutOfBounds {
        /// Offending offset
        offset: u32,
        /// Declared total size
        total_size: u32,
    },
}

impl ValidationError {
    /// Short stable label for diagnostics
    pub const fn label(&self) -> &'static str {
        match self {
            Self::HartIdOutOfRange { .. } => "HartIdOutOfRange",
            Self::NullConfigBlob => "NullConfigBlob",
            Self::MisalignedConfigBlob { .. } => "MisalignedConfigBlob",
            Self::UnreadableConfigBlob { .. } => "UnreadableConfigBlob",
            Self::BadMagic { .. } => "BadMagic",
            Self::ConfigBlobTooLarge { .. } => "ConfigBlobTooLarge",
            Self::OffsetOutOfBounds { .. } => "OffsetOutOfBounds",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HartIdOutOfRange { hart_id } => {
                write!(f, "hart id {} out of range (max {})", hart_id, MAX_HARTS - 1)
            },
            Self::NullConfigBlob => write!(f, "configuration blob address is null"),
            Self::MisalignedConfigBlob { address } => {
                write!(f, "configuration blob at {:#x} is not 4-byte aligned", address)
            },
            Self::UnreadableConfigBlob { address } => {
                write!(f, "configuration blob at {:#x} is not readable", address)
            },
            Self::BadMagic { found } => {
                write!(f, "bad magic {:#010x} (expected {:#010x})", found, CONFIG_BLOB_MAGIC)
            },
            Self::ConfigBlobTooLarge { total_size } => {
                write!(
                    f,
                    "configuration blob size {} exceeds {} bytes",
                    total_size, CONFIG_BLOB_MAX_SIZE
                )
            },
            Self::OffsetOutOfBounds { offset, total_size } => {
                write!(f, "offset {:#x} outside blob of {} bytes", offset, total_size)
            },
        }
    }
}

// =============================================================================
// BOOT ERRORS
// =============================================================================

/// Fatal boot failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// Firmware hand-off parameters were rejected
    Validation(ValidationError),
    /// Trap vector address violates stvec alignment
    MisalignedTrapVector(u64),
    /// Trap subsystem was not in a state that accepts configuration
    TrapStateConflict,
}

impl From<ValidationError> for BootError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid boot parameters: {}", err),
            Self::MisalignedTrapVector(addr) => {
                write!(f, "trap vector {:#x} is not 4-byte aligned", addr)
            },
            Self::TrapStateConflict => write!(f, "trap subsystem already terminal"),
        }
    }
}
