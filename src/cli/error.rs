// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all chancube-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use super::{cube::CubeArgsError, image::ImageArgsError};
use crate::{cube::CubeError, imaging::ImagingError, io::GlobError};

/// The *only* publicly visible error from chancube.
#[derive(Error, Debug)]
pub enum ChancubeError {
    /// An error related to allocating or filling cubes.
    #[error("{0}")]
    Cube(String),

    /// A cube and the images used to fill it disagree.
    #[error("{0}\n\nA cube must be filled with the same images (in the same order) and number of polarisations that it was allocated with.")]
    CubeConsistency(String),

    /// An error related to imaging with CASA.
    #[error("{0}\n\nThe CASA executable can be specified with --casa.")]
    Imaging(String),

    /// An error related to finding images.
    #[error("{0}")]
    Glob(String),

    /// An error related to argument files.
    #[error("{0}\n\nArgument files are toml or json files with the same keys as the long command-line arguments (with underscores instead of dashes).")]
    ArgFile(String),

    /// A cfitsio error. Because these are usually quite spartan, some
    /// suggestions are provided here.
    #[error("cfitsio error: {0}\n\nIf you don't know what this means, try turning up verbosity (-v or -vv) and maybe disabling progress bars.")]
    Cfitsio(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<CubeArgsError> for ChancubeError {
    fn from(e: CubeArgsError) -> Self {
        let s = e.to_string();
        match e {
            CubeArgsError::NoImages
            | CubeArgsError::ImagesAndGlob
            | CubeArgsError::ZeroPols
            | CubeArgsError::MissingImage(_) => Self::Cube(s),
            CubeArgsError::Glob(e) => Self::from(e),
        }
    }
}

impl From<ImageArgsError> for ChancubeError {
    fn from(e: ImageArgsError) -> Self {
        Self::Imaging(e.to_string())
    }
}

impl From<CubeError> for ChancubeError {
    fn from(e: CubeError) -> Self {
        let s = e.to_string();
        match e {
            CubeError::EmptyImageList
            | CubeError::InvalidPolCount
            | CubeError::Shape { .. }
            | CubeError::ShapeUnreadable { .. } => Self::Cube(s),
            CubeError::Consistency(_) => Self::CubeConsistency(s),
            CubeError::Fits(_) => Self::Cfitsio(s),
            CubeError::Io { .. } => Self::Generic(s),
        }
    }
}

impl From<ImagingError> for ChancubeError {
    fn from(e: ImagingError) -> Self {
        let s = e.to_string();
        match e {
            ImagingError::InvalidMsName(_)
            | ImagingError::Spawn { .. }
            | ImagingError::CasaFailed { .. } => Self::Imaging(s),
            ImagingError::Io { .. } => Self::Generic(s),
        }
    }
}

impl From<GlobError> for ChancubeError {
    fn from(e: GlobError) -> Self {
        Self::Glob(e.to_string())
    }
}

impl From<std::io::Error> for ChancubeError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
