//! Conversion settings, with defaults that can be overridden from the environment

use crate::plate::PlateOrientation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default deflate level for archive entries
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Line terminator used for every record of a CSV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// Parse `lf` / `crlf` (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lf" | "unix" => Some(LineEnding::Lf),
            "crlf" | "windows" => Some(LineEnding::CrLf),
            _ => None,
        }
    }
}

/// Cooperative abort signal shared between a host and a running conversion.
///
/// Checked between sheets; a sheet that is already being processed finishes first.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options controlling CSV rendering and archive layout
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Record terminator for every CSV entry
    pub line_ending: LineEnding,
    /// 0 stores entries uncompressed, 1-9 deflate
    pub compression_level: u32,
    /// Remove spaces from entry names (`My Sheet` -> `MySheet.csv`)
    pub strip_spaces: bool,
    /// Lay every sheet out as a plate-reader grid before writing it
    pub plate: Option<PlateOrientation>,
    /// Optional abort signal
    pub cancel: Option<CancelFlag>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            line_ending: LineEnding::Lf,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            strip_spaces: false,
            plate: None,
            cancel: None,
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `SHEETZIP_LINE_ENDING`, `SHEETZIP_COMPRESSION_LEVEL`,
    /// `SHEETZIP_STRIP_SPACES` and `SHEETZIP_PLATE_LAYOUT` (`columns`, `rows`,
    /// `1`/`true` for columns). Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Some(ending) = std::env::var("SHEETZIP_LINE_ENDING")
            .ok()
            .and_then(|s| LineEnding::parse(&s))
        {
            options.line_ending = ending;
        }

        if let Some(level) = std::env::var("SHEETZIP_COMPRESSION_LEVEL")
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
        {
            options.compression_level = level.min(9);
        }

        if let Ok(value) = std::env::var("SHEETZIP_STRIP_SPACES") {
            options.strip_spaces = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }

        if let Ok(value) = std::env::var("SHEETZIP_PLATE_LAYOUT") {
            options.plate = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(PlateOrientation::Columns),
                other => PlateOrientation::parse(other),
            };
        }

        options
    }

    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Set compression level (clamped to 0-9)
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    pub fn strip_spaces(mut self, strip: bool) -> Self {
        self.strip_spaces = strip;
        self
    }

    /// Enable or disable the plate-reader layout (columns orientation)
    pub fn plate_layout(mut self, enabled: bool) -> Self {
        self.plate = enabled.then_some(PlateOrientation::Columns);
        self
    }

    pub fn plate_orientation(mut self, orientation: PlateOrientation) -> Self {
        self.plate = Some(orientation);
        self
    }

    pub fn cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}
