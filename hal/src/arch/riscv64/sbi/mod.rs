//! # RISC-V Supervisor Binary Interface
//!
//! The firmware call gate. Every call is one synchronous `ecall` issued
//! through [`Hart::ecall`]; the result is returned as a value and never
//! retried.
//!
//! ## Calling Convention
//!
//! ```text
//! a7 = extension id      a0..a5 = arguments
//! a6 = function id
//!
//! ecall
//!
//! a0 = error code        a1 = value
//! ```
//!
//! Legacy extensions (`0x00..=0x0F`) return their result in `a0` only.

use core::fmt;

use super::hart::Hart;

pub mod base;
pub mod console;
pub mod reset;
pub mod timer;

pub use base::{
    get_impl_id, get_impl_version, get_spec_version, impl_name, is_extension_available, probe_extension,
    SpecVersion,
};
pub use console::{console_getchar, console_putchar, SbiConsole};
pub use reset::{shutdown, shutdown_with_reason, system_reset, ResetReason, ResetType};
pub use timer::{clear_timer, program_timer, read_time, set_timer};

// ============================================================================
// Extension IDs
// ============================================================================

/// SBI extension identifiers
pub mod eid {
    /// Legacy: set timer
    pub const LEGACY_SET_TIMER: u64 = 0x00;
    /// Legacy: console putchar
    pub const LEGACY_CONSOLE_PUTCHAR: u64 = 0x01;
    /// Legacy: console getchar
    pub const LEGACY_CONSOLE_GETCHAR: u64 = 0x02;
    /// Legacy: system shutdown
    pub const LEGACY_SHUTDOWN: u64 = 0x08;
    /// Base extension
    pub const BASE: u64 = 0x10;
    /// Timer extension ("TIME")
    pub const TIME: u64 = 0x5449_4D45;
    /// IPI extension ("sPI")
    pub const IPI: u64 = 0x0073_5049;
    /// Remote fence extension ("RFNC")
    pub const RFENCE: u64 = 0x5246_4E43;
    /// Hart state management ("HSM")
    pub const HSM: u64 = 0x0048_534D;
    /// System reset ("SRST")
    pub const SRST: u64 = 0x5352_5354;
}

/// Base extension function IDs
pub mod base_fid {
    /// Get SBI specification version
    pub const GET_SPEC_VERSION: u64 = 0;
    /// Get implementation ID
    pub const GET_IMPL_ID: u64 = 1;
    /// Get implementation version
    pub const GET_IMPL_VERSION: u64 = 2;
    /// Probe extension
    pub const PROBE_EXTENSION: u64 = 3;
}

// ============================================================================
// Call / Return
// ============================================================================

/// One firmware call: register image for `a0..a7`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbiCall {
    /// Extension ID (a7)
    pub extension_id: u64,
    /// Function ID (a6)
    pub function_id: u64,
    /// Arguments (a0..a5)
    pub args: [u64; 6],
}

impl SbiCall {
    /// Call with all arguments zero
    pub const fn new(extension_id: u64, function_id: u64) -> Self {
        Self {
            extension_id,
            function_id,
            args: [0; 6],
        }
    }

    /// Replace the argument vector
    pub const fn with_args(self, args: [u64; 6]) -> Self {
        Self { args, ..self }
    }

    /// Set a single argument
    ///
    /// Indices past `a5` are ignored.
    pub fn with_arg(mut self, index: usize, value: u64) -> Self {
        if let Some(slot) = self.args.get_mut(index) {
            *slot = value;
        }
        self
    }
}

/// SBI call return value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbiRet {
    /// Error code (0 = success)
    pub error: i64,
    /// Return value
    pub value: u64,
}

impl SbiRet {
    /// Successful return carrying `value`
    pub const fn success(value: u64) -> Self {
        Self { error: 0, value }
    }

    /// Failed return
    pub const fn failure(error: SbiError) -> Self {
        Self {
            error: error.code(),
            value: 0,
        }
    }

    /// Check if the call succeeded
    pub const fn is_success(&self) -> bool {
        self.error == 0
    }

    /// Get result as Option
    pub const fn ok(self) -> Option<u64> {
        if self.is_success() {
            Some(self.value)
        } else {
            None
        }
    }

    /// Get result as Result
    pub const fn into_result(self) -> Result<u64, SbiError> {
        if self.is_success() {
            Ok(self.value)
        } else {
            Err(SbiError::from_code(self.error))
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Standard SBI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbiError {
    /// SBI_ERR_FAILED
    Failed,
    /// SBI_ERR_NOT_SUPPORTED
    NotSupported,
    /// SBI_ERR_INVALID_PARAM
    InvalidParam,
    /// SBI_ERR_DENIED
    Denied,
    /// SBI_ERR_INVALID_ADDRESS
    InvalidAddress,
    /// SBI_ERR_ALREADY_AVAILABLE
    AlreadyAvailable,
    /// SBI_ERR_ALREADY_STARTED
    AlreadyStarted,
    /// SBI_ERR_ALREADY_STOPPED
    AlreadyStopped,
    /// Code outside the standard set
    Unknown(i64),
}

impl SbiError {
    /// Decode a nonzero error code
    pub const fn from_code(code: i64) -> Self {
        match code {
            -1 => Self::Failed,
            -2 => Self::NotSupported,
            -3 => Self::InvalidParam,
            -4 => Self::Denied,
            -5 => Self::InvalidAddress,
            -6 => Self::AlreadyAvailable,
            -7 => Self::AlreadyStarted,
            -8 => Self::AlreadyStopped,
            other => Self::Unknown(other),
        }
    }

    /// Raw error code
    pub const fn code(self) -> i64 {
        match self {
            Self::Failed => -1,
            Self::NotSupported => -2,
            Self::InvalidParam => -3,
            Self::Denied => -4,
            Self::InvalidAddress => -5,
            Self::AlreadyAvailable => -6,
            Self::AlreadyStarted => -7,
            Self::AlreadyStopped => -8,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for SbiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => write!(f, "failed"),
            Self::NotSupported => write!(f, "not supported"),
            Self::InvalidParam => write!(f, "invalid parameter"),
            Self::Denied => write!(f, "denied"),
            Self::InvalidAddress => write!(f, "invalid address"),
            Self::AlreadyAvailable => write!(f, "already available"),
            Self::AlreadyStarted => write!(f, "already started"),
            Self::AlreadyStopped => write!(f, "already stopped"),
            Self::Unknown(code) => write!(f, "unknown error {}", code),
        }
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Issue one firmware call
#[inline]
pub fn call<H: Hart + ?Sized>(hart: &mut H, extension_id: u64, function_id: u64, args: [u64; 6]) -> SbiRet {
    hart.ecall(&SbiCall::new(extension_id, function_id).with_args(args))
}

/// Issue a firmware call with no arguments
#[inline]
pub fn call_0<H: Hart + ?Sized>(hart: &mut H, extension_id: u64, function_id: u64) -> SbiRet {
    call(hart, extension_id, function_id, [0; 6])
}

/// Issue a firmware call with one argument
#[inline]
pub fn call_1<H: Hart + ?Sized>(hart: &mut H, extension_id: u64, function_id: u64, arg0: u64) -> SbiRet {
    call(hart, extension_id, function_id, [arg0, 0, 0, 0, 0, 0])
}

/// Issue a firmware call with two arguments
#[inline]
pub fn call_2<H: Hart + ?Sized>(
    hart: &mut H,
    extension_id: u64,
    function_id: u64,
    arg0: u64,
    arg1: u64,
) -> SbiRet {
    call(hart, extension_id, function_id, [arg0, arg1, 0, 0, 0, 0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHart;

    #[test]
    fn test_call_register_image() {
        let mut hart = MockHart::new();
        call(&mut hart, 0x1234, 7, [1, 2, 3, 4, 5, 6]);

        let recorded = hart.sbi_calls()[0];
        assert_eq!(recorded.extension_id, 0x1234);
        assert_eq!(recorded.function_id, 7);
        assert_eq!(recorded.args, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_error_passthrough() {
        let mut hart = MockHart::new();
        hart.respond(0x99, 0, SbiRet::failure(SbiError::NotSupported));

        let ret = call_0(&mut hart, 0x99, 0);
        assert!(!ret.is_success());
        assert_eq!(ret.error, -2);
        assert_eq!(ret.into_result(), Err(SbiError::NotSupported));
        // Not retried
        assert_eq!(hart.calls_to(0x99), 1);
    }

    #[test]
    fn test_error_codes() {
        for code in -8..=-1 {
            assert_eq!(SbiError::from_code(code).code(), code);
        }
        assert_eq!(SbiError::from_code(-42), SbiError::Unknown(-42));
        assert_eq!(SbiError::InvalidParam.to_string(), "invalid parameter");
    }

    #[test]
    fn test_with_arg_ignores_out_of_range() {
        let call = SbiCall::new(1, 0).with_arg(0, b'x' as u64).with_arg(9, 5);
        assert_eq!(call.args, [b'x' as u64, 0, 0, 0, 0, 0]);
    }
}
