// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::OpenOptions,
    path::Path,
    thread::{self, ScopedJoinHandle},
    time::Instant,
};

use crossbeam_channel::{bounded, Receiver, Sender};
use crossbeam_utils::atomic::AtomicCell;
use fitsio::{hdu::HduInfo, images::ImageType};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, trace, warn};
use memmap2::MmapMut;
use ndarray::{prelude::*, Zip};
use scopeguard::defer_on_unwind;

use super::{error::io_error, source::SourceImage, CubeDescriptor, CubeError};
use crate::{
    constants::{CHANNEL_AXIS_TYPE, CHANNEL_QUEUE_DEPTH},
    io::{
        read::fits::{fits_get_image_shape, fits_open, fits_open_hdu},
        write::fits::{fits_data_offset, fits_edit, fits_update_int, fits_update_str},
    },
    PROGRESS_BARS,
};

/// What to write into NAXIS3 once a cube has been filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelAxisSize {
    /// The number of channels that were copied.
    #[default]
    Exact,

    /// One more than the number of channels that were copied. Older cubes were
    /// written like this, and some downstream tools expect it. The header then
    /// declares a channel that was never filled.
    LegacyPlusOne,
}

impl ChannelAxisSize {
    pub fn naxis3(self, num_chans: usize) -> usize {
        match self {
            ChannelAxisSize::Exact => num_chans,
            ChannelAxisSize::LegacyPlusOne => num_chans + 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FillOptions {
    pub channel_axis: ChannelAxisSize,
}

/// A channel's worth of image planes, (pol, row, col).
struct ChannelPlanes {
    chan: usize,
    planes: Array3<f32>,
}

/// Fill a cube made by [`super::allocate`] with the same images and number of
/// polarisations. See [`fill_with_options`].
pub fn fill<P: AsRef<Path> + Sync>(
    images: &[P],
    output: &Path,
    num_pols: usize,
) -> Result<(), CubeError> {
    fill_with_options(images, output, num_pols, &FillOptions::default())
}

/// Copy each image's planes into the cube at `output`; image `i` becomes
/// channel `i`, and plane `p` of its first channel becomes polarisation `p`.
/// The channel axis in the header is updated afterwards.
///
/// Before anything is written, the cube's header is checked against the
/// shape derived from `images` and `num_pols`, and every image is checked to
/// have the right plane shape and enough polarisations. If anything fails
/// part-way through, the partially-filled cube is left as it is.
pub fn fill_with_options<P: AsRef<Path> + Sync>(
    images: &[P],
    output: &Path,
    num_pols: usize,
    options: &FillOptions,
) -> Result<(), CubeError> {
    let desc = CubeDescriptor::from_images(images, num_pols)?;
    let num_copied = copy_channels(images, output, &desc)?;
    patch_channel_axis(output, num_copied, options.channel_axis)?;
    Ok(())
}

/// Check the cube's primary image against `desc`, returning the offset of the
/// data section [bytes].
fn check_cube(output: &Path, desc: &CubeDescriptor) -> Result<u64, CubeError> {
    let mut fptr = fits_open(output)?;
    let hdu = fits_open_hdu(&mut fptr, 0usize)?;
    if let HduInfo::ImageInfo { image_type, .. } = &hdu.info {
        if !matches!(image_type, ImageType::Float) {
            return Err(CubeError::Consistency(format!(
                "{} has data of type {image_type:?}, but cubes must be single-precision floats",
                output.display()
            )));
        }
    }

    // Row-major, i.e. NAXIS4 first.
    let shape = fits_get_image_shape(&fptr, &hdu)?;
    let (num_pols, num_chans, rows, cols) = desc.shape();
    if shape != [num_pols, num_chans, rows, cols] {
        return Err(CubeError::Consistency(format!(
            "{} has shape {:?}, but {} images with {} polarisations need {:?}; was it allocated with different images?",
            output.display(),
            shape,
            desc.num_chans,
            desc.num_pols,
            [num_pols, num_chans, rows, cols]
        )));
    }

    let data_offset = fits_data_offset(&mut fptr)?;
    drop(fptr);

    let file_len = std::fs::metadata(output)
        .map_err(io_error(output))?
        .len();
    let needed = data_offset + desc.data_byte_len() as u64;
    if file_len < needed {
        return Err(CubeError::Consistency(format!(
            "{} is only {file_len} bytes long, but its header declares {needed} bytes",
            output.display(),
        )));
    }

    Ok(data_offset)
}

fn progress_bar(len: usize, unit: &str, message: &'static str) -> ProgressBar {
    ProgressBar::new(len as _)
        .with_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{msg:16}}: [{{wide_bar:.blue}}] {{pos:3}}/{{len:3}} {unit} ({{elapsed_precise}}<{{eta_precise}})"
                ))
                .unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message(message)
}

/// Copy all image planes into the memory-mapped cube. One thread reads the
/// images in channel order and hands each channel to a single writing thread.
/// Returns the number of channels copied.
fn copy_channels<P: AsRef<Path> + Sync>(
    images: &[P],
    output: &Path,
    desc: &CubeDescriptor,
) -> Result<usize, CubeError> {
    let data_offset = check_cube(output, desc)? as usize;
    debug!("Data section of {} starts at byte {data_offset}", output.display());

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(output)
        .map_err(io_error(output))?;
    // Safety: the cube must not be modified by anything else while it's
    // mapped.
    let mut mmap = unsafe { MmapMut::map_mut(&file) }.map_err(io_error(output))?;

    let data = &mut mmap[data_offset..data_offset + desc.data_byte_len()];
    let samples: &mut [[u8; 4]] = bytemuck::cast_slice_mut(data);
    let cube = ArrayViewMut4::from_shape(desc.shape(), samples)
        .map_err(|e| CubeError::Consistency(format!("{}: {e}", output.display())))?;

    // Channel for transferring image planes from the reader to the writer.
    let (tx_planes, rx_planes) = bounded(CHANNEL_QUEUE_DEPTH);

    // Progress bars.
    let multi_progress = MultiProgress::with_draw_target(if PROGRESS_BARS.load() {
        ProgressDrawTarget::stdout()
    } else {
        ProgressDrawTarget::hidden()
    });
    let read_progress =
        multi_progress.add(progress_bar(desc.num_chans, "images", "Reading images"));
    let write_progress =
        multi_progress.add(progress_bar(desc.num_chans, "channels", "Writing cube"));

    // Use a variable to track whether any threads have an issue.
    let error = AtomicCell::new(false);

    info!("Copying {} images into {}", images.len(), output.display());
    let scoped_threads_result: Result<usize, CubeError> = thread::scope(|scope| {
        let error = &error;

        let read_handle: ScopedJoinHandle<Result<(), CubeError>> = thread::Builder::new()
            .name("read".to_string())
            .spawn_scoped(scope, move || {
                // If a panic happens, update our atomic error.
                defer_on_unwind! { error.store(true); }
                read_progress.tick();

                let result = read_images(images, desc, tx_planes, error, &read_progress);
                // If the result of reading was an error, allow the writer to
                // see this so it can abandon its work early.
                if result.is_err() {
                    error.store(true);
                }
                result
            })
            .expect("OS can create threads");

        let write_handle: ScopedJoinHandle<Result<usize, CubeError>> = thread::Builder::new()
            .name("write".to_string())
            .spawn_scoped(scope, move || {
                defer_on_unwind! { error.store(true); }
                write_progress.tick();

                let result = write_channels(cube, rx_planes, error, &write_progress);
                if result.is_err() {
                    error.store(true);
                }
                result
            })
            .expect("OS can create threads");

        // Join all thread handles. This propagates any errors and lets us
        // know if any threads panicked.
        read_handle.join().unwrap()?;
        let num_written = write_handle.join().unwrap()?;
        Ok(num_written)
    });
    let num_written = scoped_threads_result?;

    mmap.flush().map_err(io_error(output))?;
    drop(mmap);
    drop(file);

    if num_written != desc.num_chans {
        return Err(CubeError::Consistency(format!(
            "Only {num_written} of {} channels were written to {}",
            desc.num_chans,
            output.display()
        )));
    }
    info!("Copied {num_written} channels");
    Ok(num_written)
}

/// Open every image, check them all against the cube, then read and send each
/// one's planes in channel order. All images stay open until this returns.
fn read_images<P: AsRef<Path>>(
    images: &[P],
    desc: &CubeDescriptor,
    tx: Sender<ChannelPlanes>,
    error: &AtomicCell<bool>,
    progress: &ProgressBar,
) -> Result<(), CubeError> {
    debug!("Opening all {} images", images.len());
    let mut sources = images
        .iter()
        .map(|image| SourceImage::open(image.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    for source in &sources {
        source.check_fits_cube(desc)?;
    }

    for (i_chan, source) in sources.iter_mut().enumerate() {
        // Stop early if the writer has given up.
        if error.load() {
            return Ok(());
        }

        let mut planes = Array3::zeros((desc.num_pols, desc.rows, desc.cols));
        for (i_pol, plane) in planes.outer_iter_mut().enumerate() {
            source.read_plane_into(i_pol, plane)?;
        }
        trace!("Read channel {i_chan}");

        match tx.send(ChannelPlanes {
            chan: i_chan,
            planes,
        }) {
            Ok(()) => (),
            // If we can't send the message, it's because the channel has
            // been closed on the other side. That should only happen because
            // the writer has exited due to error; in that case, just exit
            // this thread.
            Err(_) => return Ok(()),
        }
        progress.inc(1);
    }

    debug!("Finished reading; closing all images");
    progress.abandon_with_message("Finished reading images");
    Ok(())
}

/// Write each received channel into the cube as big-endian floats. Returns the
/// number of channels written.
fn write_channels(
    mut cube: ArrayViewMut4<[u8; 4]>,
    rx: Receiver<ChannelPlanes>,
    error: &AtomicCell<bool>,
    progress: &ProgressBar,
) -> Result<usize, CubeError> {
    let num_chans = cube.len_of(Axis(1));
    let mut num_written = 0;
    let mut start = Instant::now();
    for ChannelPlanes { chan, planes } in rx.iter() {
        // Stop early if the reader has given up.
        if error.load() {
            break;
        }
        if chan >= num_chans {
            return Err(CubeError::Consistency(format!(
                "Channel index {chan} is outside of the cube's {num_chans} channels"
            )));
        }

        let dest = cube.slice_mut(s![.., chan, .., ..]);
        if dest.dim() != planes.dim() {
            return Err(CubeError::Consistency(format!(
                "Channel {chan} has planes of shape {:?}, but the cube needs {:?}",
                planes.dim(),
                dest.dim()
            )));
        }
        Zip::from(dest)
            .and(&planes)
            .par_for_each(|d, &s| *d = s.to_be_bytes());

        num_written += 1;
        debug!(
            "Processed channel {}/{num_chans} in {:?}",
            chan + 1,
            start.elapsed()
        );
        start = Instant::now();
        progress.inc(1);
    }

    progress.abandon_with_message("Finished writing cube");
    Ok(num_written)
}

/// Once a cube's data has been written, give its channel axis a reference
/// pixel, its size and a type.
fn patch_channel_axis(
    output: &Path,
    num_chans: usize,
    channel_axis: ChannelAxisSize,
) -> Result<(), CubeError> {
    let naxis3 = channel_axis.naxis3(num_chans);
    if channel_axis == ChannelAxisSize::LegacyPlusOne {
        warn!("Setting NAXIS3 to {naxis3}, one more than the {num_chans} channels in the cube");
    }

    let mut fptr = fits_edit(output)?;
    fits_open_hdu(&mut fptr, 0usize)?;
    fits_update_int(&mut fptr, "CRPIX3", 1)?;
    fits_update_int(&mut fptr, "NAXIS3", naxis3 as i64)?;
    fits_update_str(&mut fptr, "CTYPE3", CHANNEL_AXIS_TYPE)?;
    drop(fptr);

    info!(
        "Updated the header of {}: CRPIX3 = 1, NAXIS3 = {naxis3}, CTYPE3 = '{CHANNEL_AXIS_TYPE}'",
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_axis_size() {
        assert_eq!(ChannelAxisSize::default(), ChannelAxisSize::Exact);
        assert_eq!(ChannelAxisSize::Exact.naxis3(3), 3);
        assert_eq!(ChannelAxisSize::LegacyPlusOne.naxis3(3), 4);
    }
}
