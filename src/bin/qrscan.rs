use clap::Parser;
use qr_reader::{Decoder, DecoderConfig, QRCode, RasterImage};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "qrscan", version, about = "Decode QR codes in image files")]
struct Cli {
    /// Print version, error correction, mask and corners for each symbol
    #[arg(long)]
    details: bool,
    /// Decode frames on the calling thread only
    #[arg(long)]
    sequential: bool,
    /// Images to scan (any format the `image` crate reads; converted to grayscale)
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = DecoderConfig::from_env();
    if cli.sequential {
        config.parallel = false;
    }
    let decoder = Decoder::new(config);

    let mut failed = false;
    for path in &cli.images {
        if let Err(err) = scan(&decoder, path, cli.details) {
            eprintln!("{}: {err}", path.display());
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn scan(decoder: &Decoder, path: &Path, details: bool) -> Result<(), image::ImageError> {
    let gray = image::open(path)?.to_luma8();
    let raster = RasterImage::from_luma(&gray);

    let start = Instant::now();
    let codes = decoder.detect(&raster);
    let elapsed = start.elapsed();
    log::info!(
        "{}: {} symbols in {:.2} ms",
        path.display(),
        codes.len(),
        elapsed.as_secs_f64() * 1000.0
    );

    for code in &codes {
        if details {
            print_details(path, code);
        } else {
            println!("{}", code.content);
        }
    }
    Ok(())
}

fn print_details(path: &Path, code: &QRCode) {
    let corners: Vec<String> = code
        .position
        .iter()
        .map(|p| format!("({:.1}, {:.1})", p.x, p.y))
        .collect();
    println!(
        "{}: version={} ec={} mask={} mirrored={} corrected={} corners=[{}]",
        path.display(),
        code.version,
        code.error_correction,
        code.mask_pattern.number(),
        code.mirrored,
        code.corrected_errors,
        corners.join(", ")
    );
    if let Some(eci) = code.payload.eci {
        println!("  eci={eci}");
    }
    if let Some(sa) = code.payload.structured_append {
        println!("  structured append {}/{} parity={:#04x}", sa.index + 1, sa.total, sa.parity);
    }
    println!("  {}", code.content);
}
