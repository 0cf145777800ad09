//! ZIP reader over an in-memory byte slice
//!
//! Reads the central directory once, then extracts entries on demand.
//! ZIP64 archives are not supported.

use super::{
    CENTRAL_DIRECTORY_SIGNATURE, END_OF_CENTRAL_DIRECTORY_SIGNATURE,
    LOCAL_FILE_HEADER_SIGNATURE, METHOD_DEFLATED, METHOD_STORED, ZIP64_EOCD_LOCATOR_SIGNATURE,
};
use crate::error::{ConvertError, Result};
use flate2::read::DeflateDecoder;
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Upper bound for buffer space reserved from a declared entry size
const MAX_PREALLOCATION: u64 = 1 << 20;

/// Entry in the ZIP central directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub compression_method: u16,
    pub offset: u64,
}

/// ZIP archive reader
pub struct ArchiveReader<'a> {
    data: Cursor<&'a [u8]>,
    entries: Vec<ArchiveEntry>,
}

impl<'a> ArchiveReader<'a> {
    /// Parse the central directory of `bytes`
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let mut data = Cursor::new(bytes);

        // Find and read central directory
        let entries = Self::read_central_directory(&mut data)?;

        Ok(ArchiveReader { data, entries })
    }

    /// Get list of all entries in central directory order
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Entry names in central directory order
    pub fn entry_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Find an entry by name
    pub fn find_entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Read an entry's decompressed data, verifying its size and CRC
    pub fn read_entry(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        self.read_entry_with_limit(entry, u64::MAX)
    }

    /// Like [`read_entry`](Self::read_entry), but refuses entries that
    /// declare more than `limit` uncompressed bytes.
    ///
    /// Output never grows past the declared size, whatever the compressed
    /// stream expands to.
    pub fn read_entry_with_limit(&mut self, entry: &ArchiveEntry, limit: u64) -> Result<Vec<u8>> {
        if entry.uncompressed_size > limit {
            return Err(ConvertError::Archive(format!(
                "entry '{}' declares {} bytes, limit is {}",
                entry.name, entry.uncompressed_size, limit
            )));
        }

        // Seek to local file header
        self.data.seek(SeekFrom::Start(entry.offset))?;

        let signature = read_u32_le(&mut self.data)?;
        if signature != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(ConvertError::Archive(format!(
                "invalid local file header for '{}'",
                entry.name
            )));
        }

        // Skip version, flags, method, time, date, CRC-32 and both sizes
        self.data.seek(SeekFrom::Current(22))?;

        let filename_len = read_u16_le(&mut self.data)? as i64;
        let extra_len = read_u16_le(&mut self.data)? as i64;
        self.data.seek(SeekFrom::Current(filename_len + extra_len))?;

        let mut compressed = Vec::new();
        (&mut self.data)
            .take(entry.compressed_size)
            .read_to_end(&mut compressed)?;
        if (compressed.len() as u64) < entry.compressed_size {
            return Err(ConvertError::Archive(format!(
                "entry '{}' is truncated",
                entry.name
            )));
        }

        let data = match entry.compression_method {
            METHOD_DEFLATED => {
                let capacity = entry.uncompressed_size.min(MAX_PREALLOCATION) as usize;
                let mut decompressed = Vec::with_capacity(capacity);
                DeflateDecoder::new(&compressed[..])
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut decompressed)?;
                decompressed
            }
            METHOD_STORED => compressed,
            method => {
                return Err(ConvertError::Archive(format!(
                    "unsupported compression method: {}",
                    method
                )))
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            return Err(ConvertError::Archive(format!(
                "size mismatch for '{}': expected {} bytes, got {}",
                entry.name,
                entry.uncompressed_size,
                data.len()
            )));
        }

        if crc32fast::hash(&data) != entry.crc32 {
            return Err(ConvertError::Archive(format!(
                "CRC mismatch for '{}'",
                entry.name
            )));
        }

        Ok(data)
    }

    /// Read an entry by name
    pub fn read_entry_by_name(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .find_entry(name)
            .ok_or_else(|| ConvertError::Archive(format!("Entry not found: {}", name)))?
            .clone();

        self.read_entry(&entry)
    }

    /// Read the central directory from the ZIP data
    fn read_central_directory(data: &mut Cursor<&[u8]>) -> Result<Vec<ArchiveEntry>> {
        let eocd_offset = Self::find_eocd(data.get_ref())?;
        data.seek(SeekFrom::Start(eocd_offset + 4))?;

        // Skip disk number fields (4 bytes)
        data.seek(SeekFrom::Current(4))?;

        let _entries_on_disk = read_u16_le(data)?;
        let total_entries = read_u16_le(data)? as usize;
        let _cd_size = read_u32_le(data)?;
        let cd_offset = read_u32_le(data)? as u64;

        if total_entries == 0xFFFF || cd_offset == 0xFFFF_FFFF {
            return Err(ConvertError::Archive("ZIP64 archives are not supported".to_string()));
        }

        data.seek(SeekFrom::Start(cd_offset))?;

        let mut entries = Vec::with_capacity(total_entries);
        for _ in 0..total_entries {
            let signature = read_u32_le(data)?;
            if signature != CENTRAL_DIRECTORY_SIGNATURE {
                return Err(ConvertError::Archive(format!(
                    "invalid central directory signature: 0x{:08x}",
                    signature
                )));
            }

            // Skip version made by, version needed, flags
            data.seek(SeekFrom::Current(6))?;

            let compression_method = read_u16_le(data)?;

            // Skip modification time and date
            data.seek(SeekFrom::Current(4))?;

            let crc32 = read_u32_le(data)?;
            let compressed_size = read_u32_le(data)? as u64;
            let uncompressed_size = read_u32_le(data)? as u64;
            let filename_len = read_u16_le(data)? as usize;
            let extra_len = read_u16_le(data)? as usize;
            let comment_len = read_u16_le(data)? as usize;

            // Skip disk number, internal attributes, external attributes
            data.seek(SeekFrom::Current(8))?;

            let offset = read_u32_le(data)? as u64;

            let mut filename_buf = vec![0u8; filename_len];
            data.read_exact(&mut filename_buf)?;
            let name = String::from_utf8_lossy(&filename_buf).to_string();

            // Skip extra field and comment
            data.seek(SeekFrom::Current((extra_len + comment_len) as i64))?;

            entries.push(ArchiveEntry {
                name,
                crc32,
                compressed_size,
                uncompressed_size,
                compression_method,
                offset,
            });
        }

        Ok(entries)
    }

    /// Find the end of central directory record by scanning from the end
    fn find_eocd(bytes: &[u8]) -> Result<u64> {
        // EOCD is at least 22 bytes, search last 65KB (max comment size + EOCD)
        if bytes.len() < 22 {
            return Err(ConvertError::Archive("data too short for a ZIP archive".to_string()));
        }
        let search_start = bytes.len().saturating_sub(65557);
        let tail = &bytes[search_start..bytes.len() - 18];

        let signature = END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes();
        tail.windows(4)
            .rposition(|w| w == signature)
            .map(|i| (search_start + i) as u64)
            .ok_or_else(|| ConvertError::Archive("End of central directory not found".to_string()))
    }
}

/// True when the data carries a ZIP64 end-of-central-directory locator
pub fn has_zip64_locator(bytes: &[u8]) -> bool {
    let search_start = bytes.len().saturating_sub(65557 + 20);
    let signature = ZIP64_EOCD_LOCATOR_SIGNATURE.to_le_bytes();
    bytes[search_start..].windows(4).any(|w| w == signature)
}

fn read_u16_le<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32_le<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
