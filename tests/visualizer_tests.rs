use image::Rgba;
use proptest::prelude::*;
use skymap_tools::colormap::{BACKGROUND, BAD_COLOR};
use skymap_tools::healpix::{self, Ordering};
use skymap_tools::image_output::save_png;
use skymap_tools::map::{CoordSys, UNSEEN};
use skymap_tools::render::{render_mollview, MollviewParams, Norm};
use skymap_tools::test_fixtures::{constant_map, sample_sky};
use skymap_tools::{read_map, write_map, HealpixMap, MapError, SkymapError};
use std::fs;
use tempfile::TempDir;

/// Pad a header to a whole FITS block.
fn header_block(cards: &[String]) -> Vec<u8> {
    let mut bytes: Vec<u8> = cards
        .iter()
        .flat_map(|card| format!("{:<80}", card).into_bytes())
        .collect();
    bytes.extend(format!("{:<80}", "END").into_bytes());
    bytes.resize(bytes.len().div_ceil(2880) * 2880, b' ');
    bytes
}

/// A map laid out with many pixels per row, as healpy writes them.
fn multi_pixel_row_file(nside: u32, per_row: u64) -> Vec<u8> {
    let npix = healpix::nside2npix(nside);
    let mut bytes = header_block(&[
        "SIMPLE  =                    T".to_string(),
        "BITPIX  =                    8".to_string(),
        "NAXIS   =                    0".to_string(),
        "EXTEND  =                    T".to_string(),
    ]);
    bytes.extend(header_block(&[
        "XTENSION= 'BINTABLE'".to_string(),
        "BITPIX  =                    8".to_string(),
        "NAXIS   =                    2".to_string(),
        format!("NAXIS1  = {:>20}", per_row * 4),
        format!("NAXIS2  = {:>20}", npix / per_row),
        "PCOUNT  =                    0".to_string(),
        "GCOUNT  =                    1".to_string(),
        "TFIELDS =                    1".to_string(),
        "TTYPE1  = 'TEMPERATURE'".to_string(),
        format!("TFORM1  = '{}E'", per_row),
        "PIXTYPE = 'HEALPIX '".to_string(),
        "ORDERING= 'NESTED  '".to_string(),
        "COORDSYS= 'G       '".to_string(),
        format!("NSIDE   = {:>20}", nside),
        "INDXSCHM= 'IMPLICIT'".to_string(),
    ]));

    let start = bytes.len();
    for pix in 0..npix {
        bytes.extend((pix as f32).to_be_bytes());
    }
    let data_len = bytes.len() - start;
    bytes.resize(start + data_len.div_ceil(2880) * 2880, 0);
    bytes
}

fn params(width: u32) -> MollviewParams {
    MollviewParams {
        width,
        ..MollviewParams::default()
    }
}

#[test]
fn test_written_map_reads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sky.fits");
    let map = sample_sky(16);

    write_map(&path, &map).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len() % 2880, 0);

    let loaded = read_map(&path).unwrap();
    assert_eq!(loaded.nside, 16);
    assert_eq!(loaded.ordering, Ordering::Ring);
    assert_eq!(loaded.coordsys, Some(CoordSys::Galactic));
    assert_eq!(loaded.values.len(), map.values.len());
    for (a, b) in loaded.values.iter().zip(&map.values) {
        // Stored as 32-bit floats
        assert!((a - b).abs() <= b.abs() * 1e-6);
    }
}

#[test]
fn test_reads_multi_pixel_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("healpy.fits");
    fs::write(&path, multi_pixel_row_file(4, 64)).unwrap();

    let map = read_map(&path).unwrap();
    assert_eq!(map.nside, 4);
    assert_eq!(map.ordering, Ordering::Nested);
    assert_eq!(map.coordsys, Some(CoordSys::Galactic));
    assert_eq!(map.values.len(), 192);
    assert_eq!(map.values[0], 0.0);
    assert_eq!(map.values[191], 191.0);

    let ring = map.to_ring();
    let north = ring.value_at(0.01, 0.0);
    assert_eq!(north, map.value_at(0.01, 0.0));
}

#[test]
fn test_missing_map_file() {
    let dir = TempDir::new().unwrap();
    let err = read_map(dir.path().join("missing.fits")).unwrap_err();
    assert!(matches!(
        err,
        SkymapError::Map(MapError::OpenFailed { .. })
    ));
}

#[test]
fn test_garbage_map_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.fits");
    fs::write(&path, b"definitely not a sky map").unwrap();
    assert!(matches!(
        read_map(&path),
        Err(SkymapError::Map(MapError::NotFits { .. }))
    ));
}

#[test]
fn test_render_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sky.fits");
    write_map(&path, &sample_sky(16)).unwrap();

    let map = read_map(&path).unwrap();
    let rendered = render_mollview(&map, &params(400)).unwrap();

    assert_eq!(rendered.image.width(), 400);
    assert_eq!(rendered.image.height(), 200 + 25);
    assert_eq!(rendered.scale.norm, Norm::Log);
    assert_eq!(rendered.scale.min, 1.0);
    assert!(rendered.scale.max > 1000.0);

    // Corners lie outside the ellipse
    assert_eq!(*rendered.image.get_pixel(0, 0), Rgba(BACKGROUND));
    assert_eq!(*rendered.image.get_pixel(399, 199), Rgba(BACKGROUND));
    assert_ne!(*rendered.image.get_pixel(150, 60), Rgba(BACKGROUND));
}

#[test]
fn test_unseen_pixels_render_gray() {
    let nside = 16;
    let npix = healpix::nside2npix(nside) as usize;
    // Northern rings unseen, the rest constant
    let values = (0..npix)
        .map(|i| if i < npix / 2 { UNSEEN } else { 10.0 })
        .collect();
    let map = HealpixMap::new(nside, Ordering::Ring, None, values).unwrap();

    let params = MollviewParams {
        graticule: None,
        ..params(400)
    };
    let rendered = render_mollview(&map, &params).unwrap();

    assert_eq!(*rendered.image.get_pixel(200, 50), Rgba(BAD_COLOR));
    let south = *rendered.image.get_pixel(200, 150);
    assert_ne!(south, Rgba(BAD_COLOR));
    assert_ne!(south, Rgba(BACKGROUND));
}

#[test]
fn test_save_png() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("map.png");
    let rendered = render_mollview(&constant_map(8, 5.0), &params(200)).unwrap();

    save_png(&rendered.image, &out).unwrap();

    let png = image::open(&out).unwrap();
    assert_eq!(png.width(), 200);
    assert_eq!(png.height(), rendered.image.height());
}

proptest! {
    #[test]
    fn prop_pixel_index_in_range(
        exp in 0u32..10,
        theta in 0.0f64..=std::f64::consts::PI,
        phi in -10.0f64..10.0,
    ) {
        let nside = 1u32 << exp;
        let npix = healpix::nside2npix(nside);
        prop_assert!(healpix::ang2pix_ring(nside, theta, phi) < npix);
        prop_assert!(healpix::ang2pix_nest(nside, theta, phi) < npix);
    }

    #[test]
    fn prop_nested_and_ring_name_same_direction(
        exp in 0u32..8,
        theta in 0.0f64..=std::f64::consts::PI,
        phi in 0.0f64..std::f64::consts::TAU,
    ) {
        let nside = 1u32 << exp;
        let nest = healpix::ang2pix_nest(nside, theta, phi);
        prop_assert_eq!(
            healpix::nest2ring(nside, nest),
            healpix::ang2pix_ring(nside, theta, phi)
        );
    }
}
