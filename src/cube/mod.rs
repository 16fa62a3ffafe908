// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Assembling single-channel images into a FITS data cube.
//!
//! This happens in two phases. [`allocate`] writes the cube's header with
//! cfitsio and extends the file to its full size without writing any data (the
//! file is sparse on filesystems that support it), so that cubes larger than
//! the available memory can be made. [`fill`] then memory-maps the cube, copies
//! each image's planes into their (polarisation, channel) slots, and updates
//! the channel axis in the header.
//!
//! The data section of a cube is a big-endian `f32` array with row-major
//! shape `(pol, chan, row, col)`; in FITS terms NAXIS1 is the columns and
//! NAXIS4 the polarisations. Both phases derive a [`CubeDescriptor`] from the
//! same image list and number of polarisations, and the fill checks that the
//! header on disk agrees with it before writing anything.

mod allocate;
mod error;
mod fill;
mod source;

pub use allocate::allocate;
pub use error::CubeError;
pub use fill::{fill, fill_with_options, ChannelAxisSize, FillOptions};

use std::path::Path;

use log::debug;

use crate::constants::{BYTES_PER_SAMPLE, FITS_BLOCK_SIZE};

/// The shape of a cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeDescriptor {
    pub rows: usize,
    pub cols: usize,
    pub num_chans: usize,
    pub num_pols: usize,
}

impl CubeDescriptor {
    /// Derive a cube's shape from a list of images. Only the first image is
    /// inspected; all others are assumed to have the same plane shape. There
    /// is one channel per image.
    pub fn from_images<P: AsRef<Path>>(
        images: &[P],
        num_pols: usize,
    ) -> Result<CubeDescriptor, CubeError> {
        let first = images.first().ok_or(CubeError::EmptyImageList)?.as_ref();
        if num_pols == 0 {
            return Err(CubeError::InvalidPolCount);
        }

        let shape =
            source::read_image_shape(first).map_err(|err| CubeError::ShapeUnreadable {
                file: first.to_path_buf(),
                err: Box::new(err),
            })?;
        debug!("{} has shape {:?}", first.display(), shape);
        let (rows, cols) = source::plane_shape(&shape).ok_or_else(|| CubeError::Shape {
            file: first.to_path_buf(),
            shape: shape.clone(),
        })?;

        Ok(CubeDescriptor {
            rows,
            cols,
            num_chans: images.len(),
            num_pols,
        })
    }

    /// The row-major shape of the data: (pol, chan, row, col).
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        (self.num_pols, self.num_chans, self.rows, self.cols)
    }

    /// The FITS axis lengths, NAXIS1 first.
    pub fn fits_axes(&self) -> [usize; 4] {
        [self.cols, self.rows, self.num_chans, self.num_pols]
    }

    pub fn num_samples(&self) -> usize {
        self.rows * self.cols * self.num_chans * self.num_pols
    }

    /// The length of the data section without padding [bytes].
    pub fn data_byte_len(&self) -> usize {
        self.num_samples() * BYTES_PER_SAMPLE
    }

    /// The length of the data section, padded to whole FITS blocks [bytes].
    pub fn padded_data_byte_len(&self) -> usize {
        self.data_byte_len().div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE
    }

    /// The reference pixels of the image plane, (CRPIX1, CRPIX2). They're at
    /// the centre of the plane.
    pub fn reference_pixels(&self) -> (usize, usize) {
        (self.cols / 2, self.rows / 2)
    }
}
