// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-channel source images.

use std::path::{Path, PathBuf};

use fitsio::{hdu::FitsHdu, FitsFile};
use ndarray::prelude::*;

use super::{CubeDescriptor, CubeError};
use crate::io::read::fits::{
    fits_get_image_shape, fits_open, fits_open_hdu, fits_read_section, FitsError,
};

/// Get the (rows, columns) of an image plane from a row-major image shape.
/// Leading length-1 axes are collapsed; the last two remaining axes are the
/// plane. An empty plane isn't usable.
pub(crate) fn plane_shape(shape: &[usize]) -> Option<(usize, usize)> {
    match collapse_leading_axes(shape) {
        [.., 0, _] | [.., _, 0] => None,
        [.., rows, cols] => Some((*rows, *cols)),
        _ => None,
    }
}

fn collapse_leading_axes(shape: &[usize]) -> &[usize] {
    let first = shape.iter().position(|&n| n != 1).unwrap_or(shape.len());
    &shape[first..]
}

/// Read the shape of the primary image in a FITS file.
pub(crate) fn read_image_shape(file: &Path) -> Result<Vec<usize>, FitsError> {
    let mut fptr = fits_open(file)?;
    let hdu = fits_open_hdu(&mut fptr, 0usize)?;
    let shape = fits_get_image_shape(&fptr, &hdu)?;
    Ok(shape.to_vec())
}

/// A single-channel image opened for reading. The file is closed when this is
/// dropped.
pub(crate) struct SourceImage {
    path: PathBuf,
    fptr: FitsFile,
    hdu: FitsHdu,
    num_pols: usize,
    num_chans: usize,
    rows: usize,
    cols: usize,
}

impl SourceImage {
    /// Open an image. After collapsing leading length-1 axes, the image's
    /// row-major axes are (pol, chan, row, col), (chan, row, col) or
    /// (row, col).
    pub(crate) fn open(path: &Path) -> Result<SourceImage, CubeError> {
        let mut fptr = fits_open(path)?;
        let hdu = fits_open_hdu(&mut fptr, 0usize)?;
        let shape = fits_get_image_shape(&fptr, &hdu)?;
        let (num_pols, num_chans, rows, cols) = match *collapse_leading_axes(shape) {
            [.., 0, _] | [.., _, 0] => {
                return Err(CubeError::Shape {
                    file: path.to_path_buf(),
                    shape: shape.to_vec(),
                })
            }
            [rows, cols] => (1, 1, rows, cols),
            [num_chans, rows, cols] => (1, num_chans, rows, cols),
            [num_pols, num_chans, rows, cols] => (num_pols, num_chans, rows, cols),
            _ => {
                return Err(CubeError::Shape {
                    file: path.to_path_buf(),
                    shape: shape.to_vec(),
                })
            }
        };

        Ok(SourceImage {
            path: path.to_path_buf(),
            fptr,
            hdu,
            num_pols,
            num_chans,
            rows,
            cols,
        })
    }

    pub(crate) fn plane_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub(crate) fn num_pols(&self) -> usize {
        self.num_pols
    }

    /// Check that this image can fill a channel of the described cube.
    pub(crate) fn check_fits_cube(&self, desc: &CubeDescriptor) -> Result<(), CubeError> {
        if self.plane_shape() != (desc.rows, desc.cols) {
            return Err(CubeError::Consistency(format!(
                "{} has an image plane of {}x{} (rows x columns), but the cube expects {}x{}",
                self.path.display(),
                self.rows,
                self.cols,
                desc.rows,
                desc.cols
            )));
        }
        if self.num_pols() < desc.num_pols {
            return Err(CubeError::Consistency(format!(
                "{} only has {} polarisations, but the cube expects {}",
                self.path.display(),
                self.num_pols,
                desc.num_pols
            )));
        }
        Ok(())
    }

    /// Read the plane at (pol, chan 0) of this image into `plane`.
    pub(crate) fn read_plane_into(
        &mut self,
        pol: usize,
        mut plane: ArrayViewMut2<f32>,
    ) -> Result<(), CubeError> {
        if pol >= self.num_pols || plane.dim() != self.plane_shape() {
            return Err(CubeError::Consistency(format!(
                "Tried to read a {:?} plane for polarisation {pol} from {}, but it has {} polarisations of {:?}",
                plane.dim(),
                self.path.display(),
                self.num_pols,
                self.plane_shape()
            )));
        }

        let plane_len = self.rows * self.cols;
        let start = pol * self.num_chans * plane_len;
        let data = fits_read_section(&mut self.fptr, &self.hdu, start, start + plane_len)?;
        plane.iter_mut().zip(data).for_each(|(p, d)| *p = d);
        Ok(())
    }
}
