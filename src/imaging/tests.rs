// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{fs, num::NonZeroUsize, path::PathBuf};

use tempfile::TempDir;

use super::*;

fn params_in(dir: &TempDir, channel_number: usize) -> ImagingParams {
    let mut params = ImagingParams::new(dir.path().join("obs1.ms"), channel_number);
    params.work_dir = dir.path().to_path_buf();
    params
}

#[test]
fn test_image_name() {
    let mut params = ImagingParams::new(PathBuf::from("/data/obs1.ms"), 7);
    params.spw = 2;
    assert_eq!(params.image_name().unwrap(), "obs1_spw_02_channel_0007");

    // Only a trailing ".ms" is removed.
    let params = ImagingParams::new(PathBuf::from("data/obs.msx.split.ms"), 1234);
    assert_eq!(
        params.image_name().unwrap(),
        "obs.msx.split_spw_00_channel_1234"
    );

    let params = ImagingParams::new(PathBuf::from("obs"), 12345);
    assert_eq!(params.image_name().unwrap(), "obs_spw_00_channel_12345");

    for bad in ["/", "..", ".ms"] {
        let params = ImagingParams::new(PathBuf::from(bad), 0);
        assert!(
            matches!(params.image_name(), Err(ImagingError::InvalidMsName(_))),
            "{bad} should be invalid"
        );
    }
}

#[test]
fn test_spw_selection() {
    let mut params = ImagingParams::new(PathBuf::from("obs1.ms"), 0);
    assert_eq!(params.spw_selection(), "0:0~7");

    params.channel_number = 3;
    params.spw = 1;
    assert_eq!(params.spw_selection(), "1:24~31");

    params.channel_group_size = NonZeroUsize::new(1).unwrap();
    params.channel_number = 5;
    assert_eq!(params.spw_selection(), "1:5~5");
}

#[test]
fn test_casa_script() {
    let dir = TempDir::new().unwrap();
    let mut params = params_in(&dir, 3);
    params.niter = 1000;
    params.threshold = "0.1mJy".to_string();
    let script = params.casa_script().unwrap();
    let lines: Vec<&str> = script.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "import numpy as np");

    let tclean = lines[2];
    assert!(tclean.starts_with("retdict = tclean(vis='"));
    assert!(tclean.contains(&format!("'{}'", dir.path().join("obs1.ms").display())));
    for arg in [
        "imagename='obs1_spw_00_channel_0003'",
        "imsize=128",
        "cell='0.004arcsec'",
        "specmode='mfs'",
        "selectdata=True",
        "spw='0:24~31'",
        "usemask='user'",
        "stokes='I'",
        "gridder='standard'",
        "niter=1000",
        "threshold='0.1mJy'",
        "parallel=False",
        "fullsummary=True",
    ] {
        assert!(tclean.contains(arg), "{arg} is missing from {tclean}");
    }
    assert_eq!(
        lines[3],
        "np.save('obs1_spw_00_channel_0003_retdict.npy', retdict)"
    );
    assert_eq!(
        lines[4],
        "exportfits(imagename='obs1_spw_00_channel_0003.image', fitsimage='obs1_spw_00_channel_0003.fits', overwrite=True)"
    );

    params.casa_log = Some(dir.path().join("casa.log"));
    let script = params.casa_script().unwrap();
    assert_eq!(
        script.lines().nth(2).unwrap(),
        format!("casalog.setlogfile('{}')", dir.path().join("casa.log").display())
    );
}

#[test]
fn test_py_str() {
    assert_eq!(py_str("I"), "'I'");
    assert_eq!(py_str("it's"), r"'it\'s'");
    assert_eq!(py_str(r"C:\data"), r"'C:\\data'");
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut params = params_in(&dir, 0);
    params.casa = PathBuf::from("chancube-casa-that-does-not-exist");
    let fits = params.run(true).unwrap();
    assert_eq!(fits, dir.path().join("obs1_spw_00_channel_0000.fits"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_casa() {
    let dir = TempDir::new().unwrap();
    let mut params = params_in(&dir, 0);
    params.casa = PathBuf::from("chancube-casa-that-does-not-exist");
    let result = params.run(false);
    assert!(matches!(result, Err(ImagingError::Spawn { .. })));
    // The script was removed.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
#[cfg(unix)]
fn test_casa_failure() {
    let dir = TempDir::new().unwrap();
    let mut params = params_in(&dir, 1);
    params.casa = PathBuf::from("false");
    let result = params.run(false);
    match result {
        Err(ImagingError::CasaFailed { name, script, .. }) => {
            assert_eq!(name, "obs1_spw_00_channel_0001");
            // The script is kept around to debug with.
            assert!(script.exists());
        }
        other => panic!("Expected CasaFailed, got {other:?}"),
    }
}

#[test]
#[cfg(unix)]
fn test_cleanup_after_success() {
    let dir = TempDir::new().unwrap();
    let mut params = params_in(&dir, 2);
    params.casa = PathBuf::from("true");
    let name = params.image_name().unwrap();

    // Pretend that CASA has already made its products.
    for ext in [".psf", ".residual", ".image", ".model", ".pb"] {
        let product = dir.path().join(format!("{name}{ext}"));
        fs::create_dir(&product).unwrap();
        fs::write(product.join("table.dat"), b"data").unwrap();
    }
    fs::write(dir.path().join(format!("{name}.sumwt")), b"data").unwrap();
    fs::write(dir.path().join(format!("{name}.fits")), b"data").unwrap();
    fs::write(dir.path().join(format!("{name}_retdict.npy")), b"data").unwrap();
    // Products of other channels are untouched.
    let other = dir.path().join("obs1_spw_00_channel_0003.image");
    fs::create_dir(&other).unwrap();

    let fits = params.run(false).unwrap();
    assert_eq!(fits, dir.path().join(format!("{name}.fits")));

    let mut remaining: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    remaining.sort();
    assert_eq!(
        remaining,
        vec![
            format!("{name}.fits"),
            format!("{name}_retdict.npy"),
            "obs1_spw_00_channel_0003.image".to_string(),
        ]
    );
}
