//! # Boot Parameter Validation
//!
//! Checks the firmware hand-off before anything depends on it. Checks run in
//! a fixed order and stop at the first failure:
//!
//! | # | Check                              | Error                  |
//! |---|------------------------------------|------------------------|
//! | 1 | `hart_id < MAX_HARTS`              | `HartIdOutOfRange`     |
//! | 2 | blob address non-null              | `NullConfigBlob`       |
//! | 3 | blob address 4-byte aligned        | `MisalignedConfigBlob` |
//! | 4 | header magic is `0xd00dfeed`       | `BadMagic`             |
//! | 5 | `total_size <= 1 MiB`              | `ConfigBlobTooLarge`   |
//! | 6 | block offsets inside the blob      | `OffsetOutOfBounds`    |
//!
//! The blob is not touched until checks 1 to 3 pass. Each check prints one
//! console line, ending in `ok` or `ERROR: <reason>`.

use core::fmt::Write;

use sable_hal::arch::riscv64::sbi::SbiConsole;
use sable_hal::Hart;

use crate::error::ValidationError;
use crate::info::{
    BlobReader, ConfigBlobHeader, HartBootInfo, CONFIG_BLOB_ALIGN, CONFIG_BLOB_MAX_SIZE, MAX_HARTS,
};

/// Validate the firmware hand-off
///
/// Returns the decoded header on success.
pub fn validate<H, R>(hart: &mut H, info: &HartBootInfo, reader: &R) -> Result<ConfigBlobHeader, ValidationError>
where
    H: Hart + ?Sized,
    R: BlobReader + ?Sized,
{
    let mut console = SbiConsole::new(hart);
    let hart_id = info.hart_id();
    let address = info.config_blob_address();

    report(&mut console, format_args!("hart_id={}", hart_id), check_hart_id(hart_id))?;
    report(&mut console, format_args!("config_blob={:#x} present", address), check_present(address))?;
    report(&mut console, format_args!("config_blob={:#x} aligned", address), check_aligned(address))?;

    let header = match reader.read_header(address) {
        Some(bytes) => ConfigBlobHeader::from_be_bytes(&bytes),
        None => {
            let err = ValidationError::UnreadableConfigBlob { address };
            return report(&mut console, format_args!("config_blob={:#x} readable", address), Err(err));
        },
    };

    report(&mut console, format_args!("magic={:#010x}", header.magic), check_magic(&header))?;
    report(&mut console, format_args!("total_size={}", header.total_size), check_size(&header))?;
    report(&mut console, format_args!("offsets"), check_offsets(&header))?;

    log::debug!(
        "config blob v{} (compat v{}), {} bytes, boot cpu {}",
        header.version,
        header.last_compatible_version,
        header.total_size,
        header.boot_cpuid
    );

    Ok(header)
}

fn report<W: Write, T>(
    console: &mut W,
    subject: core::fmt::Arguments<'_>,
    outcome: Result<T, ValidationError>,
) -> Result<T, ValidationError> {
    let _ = match &outcome {
        Ok(_) => writeln!(console, "[validate] {} ok", subject),
        Err(err) => writeln!(console, "[validate] {} ERROR: {}", subject, err),
    };
    outcome
}

// =============================================================================
// CHECKS
// =============================================================================

fn check_hart_id(hart_id: u64) -> Result<(), ValidationError> {
    if hart_id < MAX_HARTS {
        Ok(())
    } else {
        Err(ValidationError::HartIdOutOfRange { hart_id })
    }
}

fn check_present(address: u64) -> Result<(), ValidationError> {
    if address != 0 {
        Ok(())
    } else {
        Err(ValidationError::NullConfigBlob)
    }
}

fn check_aligned(address: u64) -> Result<(), ValidationError> {
    if address % CONFIG_BLOB_ALIGN == 0 {
        Ok(())
    } else {
        Err(ValidationError::MisalignedConfigBlob { address })
    }
}

fn check_magic(header: &ConfigBlobHeader) -> Result<(), ValidationError> {
    if header.has_valid_magic() {
        Ok(())
    } else {
        Err(ValidationError::BadMagic { found: header.magic })
    }
}

fn check_size(header: &ConfigBlobHeader) -> Result<(), ValidationError> {
    if header.total_size <= CONFIG_BLOB_MAX_SIZE {
        Ok(())
    } else {
        Err(ValidationError::ConfigBlobTooLarge {
            total_size: header.total_size,
        })
    }
}

fn check_offsets(header: &ConfigBlobHeader) -> Result<(), ValidationError> {
    for offset in [header.struct_offset, header.strings_offset] {
        if offset >= header.total_size {
            return Err(ValidationError::OffsetOutOfBounds {
                offset,
                total_size: header.total_size,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sable_hal::mock::MockHart;

    use super::*;
    use crate::info::{BlobWindow, CONFIG_BLOB_MAGIC};

    const BLOB_BASE: u64 = 0x8220_0000;

    fn header() -> ConfigBlobHeader {
        ConfigBlobHeader {
            magic: CONFIG_BLOB_MAGIC,
            total_size: 0x2000,
            struct_offset: 0x40,
            strings_offset: 0x1800,
            mem_rsvmap_offset: 0x28,
            version: 17,
            last_compatible_version: 16,
            boot_cpuid: 0,
            strings_size: 0x200,
        }
    }

    fn run(hart_id: u64, address: u64, header: ConfigBlobHeader) -> (Result<ConfigBlobHeader, ValidationError>, MockHart) {
        let bytes = header.to_be_bytes();
        let window = BlobWindow::new(BLOB_BASE, &bytes);
        let mut hart = MockHart::new();
        let result = validate(&mut hart, &HartBootInfo::new(hart_id, address), &window);
        (result, hart)
    }

    #[test]
    fn test_valid_parameters() {
        let (result, hart) = run(0, BLOB_BASE, header());
        assert_eq!(result, Ok(header()));

        let trace = hart.console_output();
        assert!(trace.contains("hart_id=0 ok"));
        assert!(trace.contains("magic=0xd00dfeed ok"));
        assert!(!trace.contains("ERROR"));
        assert_eq!(trace.lines().count(), 6);
    }

    #[test]
    fn test_hart_id_boundary() {
        let (result, _) = run(15, BLOB_BASE, header());
        assert!(result.is_ok());

        for hart_id in [16, 17, u64::MAX] {
            let (result, _) = run(hart_id, BLOB_BASE, header());
            assert_eq!(result, Err(ValidationError::HartIdOutOfRange { hart_id }));
        }
    }

    #[test]
    fn test_hart_id_checked_first() {
        // Null address would also fail; hart id wins
        let (result, hart) = run(17, 0, header());
        assert_eq!(result, Err(ValidationError::HartIdOutOfRange { hart_id: 17 }));
        assert_eq!(hart.console_output().lines().count(), 1);
    }

    #[test]
    fn test_null_blob() {
        let (result, _) = run(0, 0, header());
        assert_eq!(result, Err(ValidationError::NullConfigBlob));
    }

    #[test]
    fn test_misaligned_blob() {
        for address in [BLOB_BASE + 1, BLOB_BASE + 2, BLOB_BASE + 3] {
            let (result, _) = run(0, address, header());
            assert_eq!(result, Err(ValidationError::MisalignedConfigBlob { address }));
        }
    }

    #[test]
    fn test_bad_magic() {
        let mut bad = header();
        bad.magic = 0xedfe_0dd0;
        let (result, hart) = run(0, BLOB_BASE, bad);
        assert_eq!(result, Err(ValidationError::BadMagic { found: 0xedfe_0dd0 }));
        assert!(hart.console_output().contains("ERROR: bad magic"));
    }

    #[test]
    fn test_unreadable_blob() {
        let (result, _) = run(0, BLOB_BASE + 0x1000, header());
        assert_eq!(
            result,
            Err(ValidationError::UnreadableConfigBlob {
                address: BLOB_BASE + 0x1000
            })
        );
    }

    #[test]
    fn test_oversized_blob() {
        let mut big = header();
        big.total_size = CONFIG_BLOB_MAX_SIZE + 4;
        let (result, _) = run(0, BLOB_BASE, big);
        assert_eq!(
            result,
            Err(ValidationError::ConfigBlobTooLarge {
                total_size: CONFIG_BLOB_MAX_SIZE + 4
            })
        );
    }

    #[test]
    fn test_offset_out_of_bounds() {
        let mut broken = header();
        broken.strings_offset = broken.total_size;
        let (result, _) = run(0, BLOB_BASE, broken);
        assert_eq!(
            result,
            Err(ValidationError::OffsetOutOfBounds {
                offset: 0x2000,
                total_size: 0x2000
            })
        );
    }
}
