// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with imaging channels with CASA.

use std::{
    path::{Path, PathBuf},
    process::ExitStatus,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Couldn't derive an image name from the measurement set path '{0}'")]
    InvalidMsName(PathBuf),

    #[error("Couldn't run the CASA executable '{exe}': {err}")]
    Spawn { exe: PathBuf, err: std::io::Error },

    #[error("CASA exited with {status} while imaging {name}; its script was left at {script}")]
    CasaFailed {
        name: String,
        status: ExitStatus,
        script: PathBuf,
    },

    #[error("{file}: {err}")]
    Io { file: PathBuf, err: std::io::Error },
}

/// Attach a filename to an IO error.
pub(super) fn io_error(file: &Path) -> impl FnOnce(std::io::Error) -> ImagingError + '_ {
    move |err| ImagingError::Io {
        file: file.to_path_buf(),
        err,
    }
}
