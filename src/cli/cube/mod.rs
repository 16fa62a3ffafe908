// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments shared by the `concat`, `allocate` and `fill` subcommands.


use std::path::PathBuf;

use clap::Parser;
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use super::common::ARG_FILE_HELP;
use crate::{
    constants::{DEFAULT_CUBE_FILENAME, DEFAULT_NUM_POLS},
    cube::{allocate, fill_with_options, ChannelAxisSize, CubeDescriptor, FillOptions},
    io::{get_sorted_matches_from_glob, GlobError},
    ChancubeError,
};

lazy_static::lazy_static! {
    static ref NUM_POLS_HELP: String =
        format!("The number of polarisations in the cube. Each image must have at least this many. Default: {DEFAULT_NUM_POLS}");

    static ref OUTPUT_HELP: String =
        format!("The path to the output cube. Default: {DEFAULT_CUBE_FILENAME}");
}

/// Which parts of making a cube to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CubePhase {
    /// Write the header and extend the file, but don't copy any images.
    Allocate,

    /// Copy images into an already-allocated cube.
    Fill,

    /// Allocate, then fill.
    Both,
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct CubeArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// Paths to the single-channel images. The order of the images is the
    /// order of the channels in the cube.
    #[clap(short, long, multiple_values(true), help_heading = "INPUT FILES")]
    pub(super) images: Option<Vec<PathBuf>>,

    /// A glob pattern matching the single-channel images (e.g.
    /// "img_channel_*.fits"). The matches are sorted naturally, so
    /// "img_channel_9.fits" comes before "img_channel_10.fits".
    #[clap(short, long, help_heading = "INPUT FILES")]
    pub(super) glob: Option<String>,

    #[clap(short = 'p', long, help = NUM_POLS_HELP.as_str(), help_heading = "OUTPUT FILES")]
    pub(super) num_pols: Option<usize>,

    #[clap(short, long, help = OUTPUT_HELP.as_str(), help_heading = "OUTPUT FILES")]
    pub(super) output: Option<PathBuf>,

    /// Once the cube is filled, set NAXIS3 to one more than the number of
    /// channels. Older cubes were made like this; only use this if a
    /// downstream tool needs it.
    #[clap(long, help_heading = "OUTPUT FILES")]
    #[serde(default)]
    pub(super) legacy_naxis3: bool,
}

impl CubeArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<CubeArgs, ChancubeError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let CubeArgs {
                args_file: _,
                images,
                glob,
                num_pols,
                output,
                legacy_naxis3,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            // The images and glob come as a pair, so that e.g. a glob on the
            // command line isn't combined with images in the file.
            let (images, glob) = if cli_args.images.is_some() || cli_args.glob.is_some() {
                (cli_args.images, cli_args.glob)
            } else {
                (images, glob)
            };
            Ok(CubeArgs {
                args_file: None,
                images,
                glob,
                num_pols: cli_args.num_pols.or(num_pols),
                output: cli_args.output.or(output),
                legacy_naxis3: cli_args.legacy_naxis3 || legacy_naxis3,
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<CubeParams, ChancubeError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            images,
            glob,
            num_pols,
            output,
            legacy_naxis3,
        } = self;

        let images = match (images, glob) {
            (Some(_), Some(_)) => return Err(CubeArgsError::ImagesAndGlob.into()),
            (None, None) => return Err(CubeArgsError::NoImages.into()),
            (Some(images), None) => {
                if images.is_empty() {
                    return Err(CubeArgsError::NoImages.into());
                }
                if let Some(missing) = images.iter().find(|i| !i.exists()) {
                    return Err(CubeArgsError::MissingImage(missing.clone()).into());
                }
                images
            }
            (None, Some(glob)) => {
                let images = get_sorted_matches_from_glob(&glob).map_err(CubeArgsError::from)?;
                debug!("Glob '{glob}' matched {} images", images.len());
                images
            }
        };
        for (i, image) in images.iter().enumerate() {
            trace!("Channel {i}: {}", image.display());
        }

        let num_pols = num_pols.unwrap_or(DEFAULT_NUM_POLS);
        if num_pols == 0 {
            return Err(CubeArgsError::ZeroPols.into());
        }

        Ok(CubeParams {
            images,
            num_pols,
            output: output.unwrap_or_else(|| PathBuf::from(DEFAULT_CUBE_FILENAME)),
            fill_options: FillOptions {
                channel_axis: if legacy_naxis3 {
                    ChannelAxisSize::LegacyPlusOne
                } else {
                    ChannelAxisSize::Exact
                },
            },
        })
    }

    pub(super) fn run(self, dry_run: bool, phase: CubePhase) -> Result<(), ChancubeError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;

        if phase == CubePhase::Allocate
            && params.fill_options.channel_axis != ChannelAxisSize::default()
        {
            warn!("--legacy-naxis3 only affects filling; ignoring");
        }

        if dry_run {
            params.print_info()?;
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        params.run(phase)
    }
}

/// Everything needed to allocate and/or fill a cube.
#[derive(Debug)]
pub(super) struct CubeParams {
    pub(super) images: Vec<PathBuf>,
    pub(super) num_pols: usize,
    pub(super) output: PathBuf,
    pub(super) fill_options: FillOptions,
}

impl CubeParams {
    fn print_info(&self) -> Result<(), ChancubeError> {
        let desc = CubeDescriptor::from_images(&self.images, self.num_pols)?;
        info!(
            "{} images, from {} to {}",
            self.images.len(),
            self.images[0].display(),
            self.images[self.images.len() - 1].display()
        );
        info!(
            "Cube {}: {} rows, {} columns, {} channels, {} polarisations ({} bytes of data)",
            self.output.display(),
            desc.rows,
            desc.cols,
            desc.num_chans,
            desc.num_pols,
            desc.padded_data_byte_len()
        );
        Ok(())
    }

    pub(super) fn run(&self, phase: CubePhase) -> Result<(), ChancubeError> {
        self.print_info()?;
        if matches!(phase, CubePhase::Allocate | CubePhase::Both) {
            allocate(&self.images, self.num_pols, &self.output)?;
        }
        if matches!(phase, CubePhase::Fill | CubePhase::Both) {
            fill_with_options(
                &self.images,
                &self.output,
                self.num_pols,
                &self.fill_options,
            )?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum CubeArgsError {
    #[error("No images were supplied; use --images or --glob")]
    NoImages,

    #[error("Both --images and --glob were supplied; use only one")]
    ImagesAndGlob,

    #[error("The number of polarisations must be at least 1")]
    ZeroPols,

    #[error("Image {0} doesn't exist")]
    MissingImage(PathBuf),

    #[error(transparent)]
    Glob(#[from] GlobError),
}
