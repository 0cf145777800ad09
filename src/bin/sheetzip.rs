//! Command-line host: convert a workbook file into `<name>_csv.zip`,
//! or unpack the CSV files straight into a folder.

use clap::Parser;
use sheetzip::naming::archive_file_name;
use sheetzip::{ArchiveReader, ConvertOptions, LineEnding, PlateOrientation, WorkbookConverter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "sheetzip", version, about = "Convert every sheet of a workbook to CSV")]
struct Cli {
    /// Workbook to convert (.xlsx, .xls, .xlsb, .ods)
    input: PathBuf,

    /// Output archive path (default: <input>_csv.zip next to the input)
    #[arg(short, long, conflicts_with = "extract_dir")]
    output: Option<PathBuf>,

    /// Write the CSV files into this folder instead of a ZIP archive
    #[arg(long)]
    extract_dir: Option<PathBuf>,

    /// Terminate records with CRLF instead of LF
    #[arg(long)]
    crlf: bool,

    /// Compression level, 0 (store) to 9
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=9))]
    level: Option<u32>,

    /// Remove spaces from CSV file names
    #[arg(long)]
    strip_spaces: bool,

    /// Rearrange plate-reader exports (D8:S199) into ratio blocks
    #[arg(long)]
    plate_layout: bool,

    /// Block orientation for --plate-layout
    #[arg(long, requires = "plate_layout", value_parser = ["columns", "rows"])]
    orientation: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> sheetzip::Result<()> {
    let mut options = ConvertOptions::from_env();
    if cli.crlf {
        options = options.line_ending(LineEnding::CrLf);
    }
    if let Some(level) = cli.level {
        options = options.compression_level(level);
    }
    if cli.strip_spaces {
        options = options.strip_spaces(true);
    }
    if cli.plate_layout {
        let orientation = cli
            .orientation
            .as_deref()
            .and_then(PlateOrientation::parse)
            .unwrap_or_default();
        options = options.plate_orientation(orientation);
    }

    let data = std::fs::read(&cli.input)?;
    let file_name = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let conversion =
        WorkbookConverter::with_options(options).convert_with_report(&data, Some(&file_name))?;

    for issue in &conversion.issues {
        eprintln!("warning: {}", sheetzip::ConvertError::from(issue.clone()));
    }

    match &cli.extract_dir {
        Some(dir) => extract(&conversion.archive, dir)?,
        None => {
            let output = cli.output.clone().unwrap_or_else(|| {
                let parent = cli.input.parent().unwrap_or_else(|| Path::new(""));
                parent.join(archive_file_name(&file_name))
            });
            std::fs::write(&output, &conversion.archive)?;
            println!(
                "Saved {} sheet(s) to {}",
                conversion.entries.len(),
                output.display()
            );
        }
    }

    Ok(())
}

fn extract(archive: &[u8], dir: &Path) -> sheetzip::Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut reader = ArchiveReader::new(archive)?;
    let entries = reader.entries().to_vec();
    for entry in &entries {
        let data = reader.read_entry(entry)?;
        std::fs::write(dir.join(&entry.name), data)?;
    }

    println!("Saved {} file(s) in {}", entries.len(), dir.display());
    Ok(())
}
