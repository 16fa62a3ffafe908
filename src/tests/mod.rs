// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests.

use std::path::{Path, PathBuf};

use fitsio::{
    images::{ImageDescription, ImageType},
    FitsFile,
};

/// A recognisable, exactly-representable value for every pixel.
pub(crate) fn pixel_value(chan: usize, pol: usize, row: usize, col: usize) -> f32 {
    (chan * 100_000 + pol * 10_000 + row * 100 + col) as f32 - 0.25
}

/// Write a float image into the primary HDU of a new FITS file. `shape` is
/// row-major, i.e. NAXISn first.
pub(crate) fn write_image(path: &Path, shape: &[usize], data: &[f32]) {
    let description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: shape,
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .open()
        .unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    hdu.write_image(&mut fptr, data).unwrap();
}

/// Write a single-channel image with shape (pol, 1, row, col), like those
/// exported by CASA. Pixel values come from [`pixel_value`].
pub(crate) fn write_channel_image(
    path: &Path,
    chan: usize,
    num_pols: usize,
    rows: usize,
    cols: usize,
) {
    let mut data = Vec::with_capacity(num_pols * rows * cols);
    for pol in 0..num_pols {
        for row in 0..rows {
            for col in 0..cols {
                data.push(pixel_value(chan, pol, row, col));
            }
        }
    }
    write_image(path, &[num_pols, 1, rows, cols], &data);
}

/// Write `num_chans` images named `chan_<i>.fits` into `dir`.
pub(crate) fn write_channel_images(
    dir: &Path,
    num_chans: usize,
    num_pols: usize,
    rows: usize,
    cols: usize,
) -> Vec<PathBuf> {
    (0..num_chans)
        .map(|chan| {
            let path = dir.join(format!("chan_{chan}.fits"));
            write_channel_image(&path, chan, num_pols, rows, cols);
            path
        })
        .collect()
}
