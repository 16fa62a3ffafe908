// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Failing fills must close every file they opened, whether they fail while
//! opening images or while copying them. This is its own test
//! binary so that no other tests open files at the same time.

#![cfg(target_os = "linux")]

use std::path::{Path, PathBuf};

use fitsio::{
    images::{ImageDescription, ImageType},
    FitsFile,
};
use tempfile::TempDir;

use chancube::{allocate, fill, CubeError};

fn num_open_fds() -> usize {
    std::fs::read_dir("/proc/self/fd").unwrap().count()
}

fn write_image(path: &Path, rows: usize, cols: usize) {
    let description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: &[1, 1, rows, cols],
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .open()
        .unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    hdu.write_image(&mut fptr, &vec![1.0; rows * cols]).unwrap();
}

#[test]
fn test_failing_fills_dont_leak_file_descriptors() {
    let dir = TempDir::new().unwrap();
    let images: Vec<PathBuf> = (0..8)
        .map(|i| {
            let path = dir.path().join(format!("chan_{i}.fits"));
            write_image(&path, 8, 8);
            path
        })
        .collect();
    let cube = dir.path().join("cube.fits");
    allocate(&images, 1, &cube).unwrap();

    // The k-th image has the wrong shape, or isn't a FITS file at all.
    let mut bad_shape = images.clone();
    let wrong = dir.path().join("wrong_shape.fits");
    write_image(&wrong, 8, 9);
    bad_shape[5] = wrong;
    let mut not_fits = images.clone();
    let garbage = dir.path().join("garbage.fits");
    std::fs::write(&garbage, vec![b'x'; 2880]).unwrap();
    not_fits[5] = garbage;
    // A header that opens fine, but with no data behind it, so reading fails
    // part-way through the copy.
    let mut truncated = images.clone();
    let no_data = dir.path().join("no_data.fits");
    write_image(&no_data, 8, 8);
    std::fs::OpenOptions::new()
        .write(true)
        .open(&no_data)
        .unwrap()
        .set_len(2880)
        .unwrap();
    truncated[5] = no_data;

    let before = num_open_fds();
    for _ in 0..20 {
        assert!(matches!(
            fill(&bad_shape, &cube, 1),
            Err(CubeError::Consistency(_))
        ));
        assert!(matches!(fill(&not_fits, &cube, 1), Err(CubeError::Fits(_))));
        assert!(matches!(fill(&truncated, &cube, 1), Err(CubeError::Fits(_))));
    }
    let after = num_open_fds();
    assert!(
        after <= before,
        "{before} file descriptors were open before the fills, but {after} were open after"
    );

    // The cube is still usable.
    fill(&images, &cube, 1).unwrap();
    assert!(num_open_fds() <= before);
}
