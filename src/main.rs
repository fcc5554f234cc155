mod binary_utils;
mod formats;
mod graphics;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use formats::bmp::{read_bmp, write_bmp};
use formats::ega;
use formats::CodecError;
use graphics::palette::EGA_PALETTE;
use graphics::preview::{save_preview, PreviewError};

#[derive(Parser)]
#[command(
    name = "ega_convert",
    about = "Convert between Electronic Arts EGA images and 16-colour BMP files"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a 16-colour BMP image to the EGA run-length format
    Encode {
        /// Input BMP file
        input: PathBuf,
        /// Output file; defaults to the input name with an .EGA extension
        output: Option<PathBuf>,
    },
    /// Convert an EGA image back to a 16-colour BMP
    Decode {
        /// Input EGA file
        input: PathBuf,
        /// Output file; defaults to the input name with a .BMP extension
        output: Option<PathBuf>,
        /// Additionally save an RGBA PNG preview
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Print dimensions and record statistics for an EGA stream
    Info {
        /// Input EGA file
        input: PathBuf,
        /// Emit the statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug)]
enum ToolError {
    Codec(CodecError),
    Preview(PreviewError),
    Json(serde_json::Error),
    Io(io::Error),
}

impl From<CodecError> for ToolError {
    fn from(err: CodecError) -> Self {
        ToolError::Codec(err)
    }
}
impl From<PreviewError> for ToolError {
    fn from(err: PreviewError) -> Self {
        ToolError::Preview(err)
    }
}
impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Json(err)
    }
}
impl From<io::Error> for ToolError {
    fn from(err: io::Error) -> Self {
        ToolError::Io(err)
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::Codec(err) => write!(f, "{}", err),
            ToolError::Preview(err) => write!(f, "{}", err),
            ToolError::Json(err) => write!(f, "JSON error: {}", err),
            ToolError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Encode { input, output } => run_encode(&input, output),
        Command::Decode {
            input,
            output,
            preview,
        } => run_decode(&input, output, preview),
        Command::Info { input, json } => run_info(&input, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run_encode(input: &Path, output: Option<PathBuf>) -> Result<(), ToolError> {
    let out_path = output.unwrap_or_else(|| input.with_extension("EGA"));

    let data = fs::read(input)?;
    let bmp = read_bmp(&data)?;
    println!("Resolution: {} x {}", bmp.width, bmp.height);

    let encoded = ega::encode(&bmp.pixels, bmp.width, bmp.height)?;
    fs::write(&out_path, &encoded)?;
    println!(
        "Created EGA file: {} ({} bytes)",
        out_path.display(),
        encoded.len()
    );

    Ok(())
}

fn run_decode(
    input: &Path,
    output: Option<PathBuf>,
    preview: Option<PathBuf>,
) -> Result<(), ToolError> {
    let out_path = output.unwrap_or_else(|| input.with_extension("BMP"));

    let data = fs::read(input)?;
    let image = ega::decode(&data)?;
    println!("Resolution: {} x {}", image.width, image.height);

    let bmp = write_bmp(&image.pixels, image.width, image.height, &EGA_PALETTE)?;
    fs::write(&out_path, &bmp)?;
    println!("Created BMP file: {}", out_path.display());

    if let Some(preview_path) = preview {
        save_preview(
            &image.pixels,
            image.width,
            image.height,
            &EGA_PALETTE,
            &preview_path,
        )?;
        println!("Saved preview: {}", preview_path.display());
    }

    Ok(())
}

fn run_info(input: &Path, json: bool) -> Result<(), ToolError> {
    let data = fs::read(input)?;
    let info = ega::inspect(&data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Resolution: {} x {}", info.width, info.height);
        println!(
            "Encoded size: {} bytes for {} pixels",
            info.encoded_size, info.decoded_size
        );
        println!(
            "Literal records: {} covering {} packed bytes",
            info.literal_records, info.literal_bytes
        );
        println!(
            "Repeat records: {} covering {} packed bytes",
            info.repeat_records, info.repeat_bytes
        );
    }

    Ok(())
}
