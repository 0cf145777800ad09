//! In-memory ZIP writer that compresses each entry on-the-fly
//!
//! Entries are deflated into a scratch buffer while CRC and sizes are
//! tracked, so every local header is written with final values and no
//! data descriptor is needed.

use super::{
    CENTRAL_DIRECTORY_SIGNATURE, DOS_DATE_1980_01_01, END_OF_CENTRAL_DIRECTORY_SIGNATURE,
    FLAG_UTF8_NAMES, LOCAL_FILE_HEADER_SIGNATURE, METHOD_DEFLATED, METHOD_STORED,
};
use crate::error::{ConvertError, Result};
use crc32fast::Hasher as Crc32;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::Write;

/// Largest entry count an archive without ZIP64 records can carry
pub const MAX_ENTRIES: usize = u16::MAX as usize - 1;

/// Entry already written to the archive
struct ZipEntry {
    name: String,
    method: u16,
    local_header_offset: u32,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
}

struct CurrentEntry {
    name: String,
    crc: Crc32,
    uncompressed_count: u64,
    sink: EntrySink,
}

enum EntrySink {
    Stored(Vec<u8>),
    Deflated(DeflateEncoder<Vec<u8>>),
}

/// ZIP writer producing the whole archive as a byte vector
pub struct ArchiveWriter {
    output: Vec<u8>,
    entries: Vec<ZipEntry>,
    current_entry: Option<CurrentEntry>,
    compression_level: u32,
}

impl ArchiveWriter {
    /// Create a writer; level 0 stores entries, 1-9 deflates them
    pub fn new(compression_level: u32) -> Self {
        Self {
            output: Vec::new(),
            entries: Vec::new(),
            current_entry: None,
            compression_level: compression_level.min(9),
        }
    }

    /// Start a new entry (file) in the ZIP
    pub fn start_entry(&mut self, name: &str) -> Result<()> {
        // Finish previous entry if any
        self.finish_current_entry()?;

        if name.len() > u16::MAX as usize {
            return Err(ConvertError::Archive(format!(
                "entry name too long ({} bytes)",
                name.len()
            )));
        }
        // 0xFFFF in the entry count is the ZIP64 marker
        if self.entries.len() >= MAX_ENTRIES {
            return Err(ConvertError::Archive(format!(
                "more than {} entries would require ZIP64",
                MAX_ENTRIES
            )));
        }

        let sink = if self.compression_level == 0 {
            EntrySink::Stored(Vec::new())
        } else {
            EntrySink::Deflated(DeflateEncoder::new(
                Vec::new(),
                Compression::new(self.compression_level),
            ))
        };

        self.current_entry = Some(CurrentEntry {
            name: name.to_string(),
            crc: Crc32::new(),
            uncompressed_count: 0,
            sink,
        });

        Ok(())
    }

    /// Write uncompressed data to current entry (will be compressed on-the-fly)
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let Some(entry) = self.current_entry.as_mut() else {
            return Err(ConvertError::Archive("No entry started".to_string()));
        };

        entry.crc.update(data);
        entry.uncompressed_count += data.len() as u64;

        match &mut entry.sink {
            EntrySink::Stored(buffer) => buffer.extend_from_slice(data),
            EntrySink::Deflated(encoder) => encoder.write_all(data)?,
        }
        Ok(())
    }

    /// Convenience for a complete entry
    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.start_entry(name)?;
        self.write_data(data)
    }

    /// Number of entries written so far, including an unfinished one
    pub fn entry_count(&self) -> usize {
        self.entries.len() + usize::from(self.current_entry.is_some())
    }

    /// Finish current entry: local header followed by its data
    fn finish_current_entry(&mut self) -> Result<()> {
        let Some(entry) = self.current_entry.take() else {
            return Ok(());
        };

        let (method, data) = match entry.sink {
            EntrySink::Stored(buffer) => (METHOD_STORED, buffer),
            EntrySink::Deflated(encoder) => (METHOD_DEFLATED, encoder.finish()?),
        };

        let crc32 = entry.crc.finalize();
        let uncompressed_size = to_u32(entry.uncompressed_count, "entry size")?;
        let compressed_size = to_u32(data.len() as u64, "compressed entry size")?;
        let local_header_offset = to_u32(self.output.len() as u64, "archive size")?;

        let out = &mut self.output;
        out.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&FLAG_UTF8_NAMES.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // mod time
        out.extend_from_slice(&DOS_DATE_1980_01_01.to_le_bytes());
        out.extend_from_slice(&crc32.to_le_bytes());
        out.extend_from_slice(&compressed_size.to_le_bytes());
        out.extend_from_slice(&uncompressed_size.to_le_bytes());
        out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra len
        out.extend_from_slice(entry.name.as_bytes());
        out.extend_from_slice(&data);

        self.entries.push(ZipEntry {
            name: entry.name,
            method,
            local_header_offset,
            crc32,
            compressed_size,
            uncompressed_size,
        });

        Ok(())
    }

    /// Finish ZIP (write central directory) and return the archive bytes
    pub fn finish(mut self) -> Result<Vec<u8>> {
        // Finish last entry
        self.finish_current_entry()?;

        let central_dir_offset = to_u32(self.output.len() as u64, "archive size")?;

        let out = &mut self.output;
        for entry in &self.entries {
            out.extend_from_slice(&CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes()); // version made by
            out.extend_from_slice(&20u16.to_le_bytes()); // version needed
            out.extend_from_slice(&FLAG_UTF8_NAMES.to_le_bytes());
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // mod time
            out.extend_from_slice(&DOS_DATE_1980_01_01.to_le_bytes());
            out.extend_from_slice(&entry.crc32.to_le_bytes());
            out.extend_from_slice(&entry.compressed_size.to_le_bytes());
            out.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // extra len
            out.extend_from_slice(&0u16.to_le_bytes()); // file comment len
            out.extend_from_slice(&0u16.to_le_bytes()); // disk number start
            out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
            out.extend_from_slice(&entry.local_header_offset.to_le_bytes());
            out.extend_from_slice(entry.name.as_bytes());
        }

        let central_dir_size = to_u32(
            self.output.len() as u64 - u64::from(central_dir_offset),
            "central directory size",
        )?;
        let entry_count = self.entries.len() as u16;

        // Write end of central directory
        let out = &mut self.output;
        out.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // disk number
        out.extend_from_slice(&0u16.to_le_bytes()); // disk with central dir
        out.extend_from_slice(&entry_count.to_le_bytes());
        out.extend_from_slice(&entry_count.to_le_bytes());
        out.extend_from_slice(&central_dir_size.to_le_bytes());
        out.extend_from_slice(&central_dir_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // comment len

        Ok(self.output)
    }
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ConvertError::Archive(format!("{} exceeds 4 GiB and would require ZIP64", what)))
}
