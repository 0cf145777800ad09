//! Minimal ZIP container support
//!
//! - `ArchiveWriter` builds the output archive in memory
//! - `ArchiveReader` lists and extracts entries, used to sniff workbook
//!   containers and by hosts that unpack the result

pub mod reader;
pub mod writer;

pub use reader::{ArchiveEntry, ArchiveReader};
pub use writer::{ArchiveWriter, MAX_ENTRIES};

/// ZIP local file header signature
pub(crate) const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;

/// ZIP central directory signature
pub(crate) const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x02014b50;

/// ZIP end of central directory signature
pub(crate) const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06054b50;

/// ZIP64 end of central directory locator signature
pub(crate) const ZIP64_EOCD_LOCATOR_SIGNATURE: u32 = 0x07064b50;

pub(crate) const METHOD_STORED: u16 = 0;
pub(crate) const METHOD_DEFLATED: u16 = 8;

/// General purpose flag bit 11: names are UTF-8
pub(crate) const FLAG_UTF8_NAMES: u16 = 1 << 11;

/// MS-DOS date for 1980-01-01, the earliest representable day
pub(crate) const DOS_DATE_1980_01_01: u16 = (1 << 5) | 1;
