// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with allocating and filling cubes.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::io::read::fits::FitsError;

#[derive(Error, Debug)]
pub enum CubeError {
    #[error("No images were supplied; at least one is needed to make a cube")]
    EmptyImageList,

    #[error("The number of polarisations must be at least 1")]
    InvalidPolCount,

    /// The image doesn't have two usable dimensions.
    #[error("{file}: image shape {shape:?} doesn't have a non-empty 2D plane after collapsing leading length-1 axes")]
    Shape { file: PathBuf, shape: Vec<usize> },

    /// The shape of the image couldn't be determined at all.
    #[error("Couldn't get an image shape from {file}: {err}")]
    ShapeUnreadable { file: PathBuf, err: Box<FitsError> },

    #[error("{file}: {err}")]
    Io { file: PathBuf, err: std::io::Error },

    /// The cube and its images don't agree with each other.
    #[error("{0}")]
    Consistency(String),

    #[error(transparent)]
    Fits(#[from] FitsError),
}

/// Attach a filename to an IO error.
pub(super) fn io_error(file: &Path) -> impl FnOnce(std::io::Error) -> CubeError + '_ {
    move |err| CubeError::Io {
        file: file.to_path_buf(),
        err,
    }
}
