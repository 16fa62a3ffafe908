// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod concat;
mod image;

use std::{path::Path, process::Output, str::from_utf8};

use assert_cmd::{output::OutputError, Command};
use fitsio::{
    images::{ImageDescription, ImageType},
    FitsFile,
};

fn chancube() -> Command {
    Command::cargo_bin("chancube").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// Write an image with shape (pol, 1, row, col) where every pixel of
/// polarisation `p` has the value `chan * 10 + p`.
fn write_channel_image(path: &Path, chan: usize, num_pols: usize, rows: usize, cols: usize) {
    let data: Vec<f32> = (0..num_pols)
        .flat_map(|pol| std::iter::repeat((chan * 10 + pol) as f32).take(rows * cols))
        .collect();
    let description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: &[num_pols, 1, rows, cols],
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .open()
        .unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    hdu.write_image(&mut fptr, &data).unwrap();
}
