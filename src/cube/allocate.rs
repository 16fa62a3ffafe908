// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::OpenOptions,
    io::{Seek, SeekFrom, Write},
    path::Path,
};

use fitsio::images::{ImageDescription, ImageType};
use log::{debug, info};

use super::{error::io_error, CubeDescriptor, CubeError};
use crate::io::{
    read::fits::fits_open_hdu,
    write::fits::{fits_create, fits_data_offset, fits_edit, fits_update_int},
};

/// Create an empty cube at `output` big enough to hold one channel per image
/// and `num_pols` polarisations. Any existing file is overwritten.
///
/// A 1x1x1x1 image is written first to get a header of the right size. The
/// file is then extended to its full size by writing a single byte at its
/// end, so on filesystems with sparse-file support no space is used for the
/// (zero) data until it's filled. Finally the header's axes are set to the
/// cube's.
pub fn allocate<P: AsRef<Path>>(
    images: &[P],
    num_pols: usize,
    output: &Path,
) -> Result<CubeDescriptor, CubeError> {
    let desc = CubeDescriptor::from_images(images, num_pols)?;
    info!(
        "Allocating a cube of {} rows, {} columns, {} channels and {} polarisations",
        desc.rows, desc.cols, desc.num_chans, desc.num_pols
    );

    let data_offset = write_placeholder(output, &desc)?;
    let total_len = data_offset + desc.padded_data_byte_len() as u64;
    debug!(
        "Header is {data_offset} bytes, data is {} bytes ({} padded)",
        desc.data_byte_len(),
        desc.padded_data_byte_len()
    );

    // cfitsio must be closed while the file is extended, otherwise it fills
    // the gap with zeros itself.
    let mut file = OpenOptions::new()
        .write(true)
        .open(output)
        .map_err(io_error(output))?;
    file.seek(SeekFrom::Start(total_len - 1))
        .map_err(io_error(output))?;
    file.write_all(&[0]).map_err(io_error(output))?;
    file.sync_all().map_err(io_error(output))?;
    drop(file);

    // Now that the file is big enough, declare the real axes.
    let mut fptr = fits_edit(output)?;
    fits_open_hdu(&mut fptr, 0usize)?;
    for (i, n) in desc.fits_axes().into_iter().enumerate() {
        fits_update_int(&mut fptr, &format!("NAXIS{}", i + 1), n as i64)?;
    }
    drop(fptr);

    info!("Wrote empty cube {} ({total_len} bytes)", output.display());
    Ok(desc)
}

/// Write a cube header declaring a single sample, returning the offset of the
/// data section [bytes].
fn write_placeholder(output: &Path, desc: &CubeDescriptor) -> Result<u64, CubeError> {
    let image_description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: &[1, 1, 1, 1],
    };
    let mut fptr = fits_create(output, &image_description)?;
    fits_open_hdu(&mut fptr, 0usize)?;
    let (crpix1, crpix2) = desc.reference_pixels();
    fits_update_int(&mut fptr, "CRPIX1", crpix1 as i64)?;
    fits_update_int(&mut fptr, "CRPIX2", crpix2 as i64)?;
    let data_offset = fits_data_offset(&mut fptr)?;
    Ok(data_offset)
}
