use anyhow::Context;
use clap::{Parser, ValueEnum};
use skymap_tools::healpix::{validate_nside, Ordering};
use skymap_tools::test_fixtures::{constant_map, dipole_map, plane_map, sample_sky};
use skymap_tools::{logging, write_map};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    /// Galactic plane with a few bright sources
    Sky,
    /// Gaussian band along the equator
    Plane,
    /// North/south dipole
    Dipole,
    /// Every pixel set to 10
    Constant,
}

/// Write a synthetic HEALPix map for trying out `vis-map`
#[derive(Parser, Debug)]
#[command(name = "generate-sample-map", version, about)]
struct Args {
    /// Output FITS file
    #[arg(short, long, default_value = "sample_map.fits")]
    output: PathBuf,

    /// Resolution parameter (a power of two for --nested)
    #[arg(long, default_value_t = 32)]
    nside: u32,

    #[arg(long, value_enum, default_value_t = Kind::Sky)]
    kind: Kind,

    /// Store the pixels in NESTED order
    #[arg(long)]
    nested: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    validate_nside(u64::from(args.nside), Ordering::Ring)?;

    let map = match args.kind {
        Kind::Sky => sample_sky(args.nside),
        Kind::Plane => plane_map(args.nside, 1.0, 500.0, 10.0),
        Kind::Dipole => dipole_map(args.nside, 100.0, 50.0),
        Kind::Constant => constant_map(args.nside, 10.0),
    };
    let map = if args.nested { map.to_nested()? } else { map };

    write_map(&args.output, &map)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "Wrote nside {} {} map to {}",
        map.nside,
        map.ordering,
        args.output.display()
    );
    Ok(())
}
