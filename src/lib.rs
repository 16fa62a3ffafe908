// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Assemble per-channel radio-interferometric images into a single FITS data
//! cube, and image single channels of measurement sets with CASA to make
//! those images.

mod cli;
pub mod constants;
pub mod cube;
pub mod imaging;
pub mod io;

#[cfg(test)]
mod tests;

use crossbeam_utils::atomic::AtomicCell;

/// Should progress bars be drawn? This is only ever changed by the CLI.
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);

// Re-exports.
pub use cli::{Chancube, ChancubeError};
pub use cube::{
    allocate, fill, fill_with_options, ChannelAxisSize, CubeDescriptor, CubeError, FillOptions,
};
pub use imaging::{ImagingError, ImagingParams};
pub use io::{get_sorted_matches_from_glob, natural_sort, GlobError};
