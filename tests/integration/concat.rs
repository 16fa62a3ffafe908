// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use fitsio::{hdu::HduInfo, FitsFile};
use tempfile::TempDir;

use crate::{chancube, get_cmd_output, write_channel_image};

#[test]
fn test_concat_glob() {
    let dir = TempDir::new().unwrap();
    for chan in 0..12 {
        write_channel_image(
            &dir.path().join(format!("obs_spw_00_channel_{chan}.fits")),
            chan,
            2,
            16,
            12,
        );
    }
    let glob = format!("{}/obs_spw_00_channel_*.fits", dir.path().display());
    let cube = dir.path().join("cube.fits");

    #[rustfmt::skip]
    let cmd = chancube()
        .args([
            "concat",
            "--glob", &glob,
            "--num-pols", "2",
            "--output", &cube.display().to_string(),
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "concat failed on simple test data: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("chancube concat complete."), "{stdout}");

    let mut fptr = FitsFile::open(&cube).unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => assert_eq!(shape, &[2, 12, 16, 12]),
        _ => panic!("The cube isn't an image"),
    }
    let data: Vec<f32> = hdu.read_image(&mut fptr).unwrap();
    // Channels are in natural order, so channel 10 comes after channel 9.
    for pol in 0..2 {
        for chan in 0..12 {
            let start = (pol * 12 + chan) * 16 * 12;
            assert!(data[start..start + 16 * 12]
                .iter()
                .all(|&v| v == (chan * 10 + pol) as f32));
        }
    }
}

#[test]
fn test_allocate_and_fill_separately() {
    let dir = TempDir::new().unwrap();
    for chan in 0..3 {
        write_channel_image(
            &dir.path().join(format!("chan_{chan}.fits")),
            chan,
            4,
            8,
            8,
        );
    }
    let glob = format!("{}/chan_*.fits", dir.path().display());
    let cube = dir.path().join("cube.fits");
    let cube_str = cube.display().to_string();

    let cmd = chancube()
        .args(["allocate", "--glob", &glob, "--output", &cube_str])
        .ok();
    assert!(cmd.is_ok(), "{}", cmd.err().unwrap());
    // Header and data, each padded to whole blocks.
    assert_eq!(
        std::fs::metadata(&cube).unwrap().len(),
        2880 + (4 * 3 * 8 * 8 * 4_u64).div_ceil(2880) * 2880
    );

    // A different number of polarisations doesn't match the cube.
    let cmd = chancube()
        .args(["fill", "--glob", &glob, "--output", &cube_str, "--num-pols", "2"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: "), "{stderr}");

    let cmd = chancube()
        .args(["fill", "--glob", &glob, "--output", &cube_str])
        .ok();
    assert!(cmd.is_ok(), "{}", cmd.err().unwrap());

    let mut fptr = FitsFile::open(&cube).unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    let data: Vec<f32> = hdu.read_image(&mut fptr).unwrap();
    assert_eq!(data.len(), 4 * 3 * 8 * 8);
    assert_eq!(data[0], 0.0);
    assert_eq!(data[data.len() - 1], 23.0);
}

#[test]
fn test_save_toml_and_dry_run() {
    let dir = TempDir::new().unwrap();
    write_channel_image(&dir.path().join("chan_0.fits"), 0, 1, 4, 4);
    let glob = format!("{}/chan_*.fits", dir.path().display());
    let cube = dir.path().join("cube.fits");
    let toml = dir.path().join("args.toml");

    #[rustfmt::skip]
    let cmd = chancube()
        .args([
            "concat",
            "--glob", &glob,
            "--num-pols", "1",
            "--output", &cube.display().to_string(),
            "--save-toml", &toml.display().to_string(),
            "--dry-run",
        ])
        .ok();
    assert!(cmd.is_ok(), "{}", cmd.err().unwrap());
    assert!(!cube.exists());

    // The saved arguments reproduce the run.
    let contents = std::fs::read_to_string(&toml).unwrap();
    assert!(contents.contains("num_pols = 1"), "{contents}");
    let cmd = chancube()
        .args(["concat", &toml.display().to_string(), "--no-progress-bars"])
        .ok();
    assert!(cmd.is_ok(), "{}", cmd.err().unwrap());
    assert!(cube.exists());
}

#[test]
fn test_no_matches_is_an_error() {
    let dir = TempDir::new().unwrap();
    let glob = format!("{}/nothing_*.fits", dir.path().display());
    let cmd = chancube().args(["concat", "--glob", &glob]).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: No glob matches"), "{stderr}");
}
