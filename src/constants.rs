// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.
 */

/// The size of a FITS block [bytes]. Headers and data sections are always
/// padded to a multiple of this.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// The number of bytes per cube sample. Samples are IEEE-754
/// single-precision floats (BITPIX = -32).
pub const BYTES_PER_SAMPLE: usize = std::mem::size_of::<f32>();

/// The default number of polarisations (Stokes parameters) in a cube.
pub const DEFAULT_NUM_POLS: usize = 4;

/// The default path of the output cube.
pub const DEFAULT_CUBE_FILENAME: &str = "concat.fits";

/// The number of channels buffered between the image-reading and
/// cube-writing threads.
pub(crate) const CHANNEL_QUEUE_DEPTH: usize = 3;

/// The type label given to the channel axis once a cube has been filled.
pub const CHANNEL_AXIS_TYPE: &str = "FREQ";

/// The number of measurement-set channels averaged into each imaged channel.
pub const DEFAULT_CHANNEL_GROUP_SIZE: usize = 8;

pub const DEFAULT_SPW: usize = 0;
pub const DEFAULT_GRIDDER: &str = "standard";

/// [pixels]
pub const DEFAULT_IMSIZE: usize = 128;
pub const DEFAULT_CELL: &str = "0.004arcsec";
pub const DEFAULT_STOKES: &str = "I";
pub const DEFAULT_NITER: usize = 0;
pub const DEFAULT_USEMASK: &str = "user";
pub const DEFAULT_THRESHOLD: &str = "0.0mJy";
pub const DEFAULT_CASA_EXE: &str = "casa";

/// CASA products made alongside each exported image. All of them are removed
/// once the image has been exported to FITS.
pub const CASA_INTERMEDIATE_EXTENSIONS: [&str; 9] = [
    ".psf",
    ".residual",
    ".sumwt",
    ".weight",
    ".pb",
    ".image",
    ".model",
    ".ms",
    ".mask",
];
