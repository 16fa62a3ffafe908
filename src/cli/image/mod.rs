// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use std::{num::NonZeroUsize, path::PathBuf};

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::common::ARG_FILE_HELP;
use crate::{
    constants::{
        DEFAULT_CASA_EXE, DEFAULT_CELL, DEFAULT_CHANNEL_GROUP_SIZE, DEFAULT_GRIDDER,
        DEFAULT_IMSIZE, DEFAULT_NITER, DEFAULT_SPW, DEFAULT_STOKES, DEFAULT_THRESHOLD,
        DEFAULT_USEMASK,
    },
    imaging::ImagingParams,
    ChancubeError,
};

lazy_static::lazy_static! {
    static ref CHANNEL_GROUP_SIZE_HELP: String =
        format!("The number of measurement-set channels imaged together as one channel. Default: {DEFAULT_CHANNEL_GROUP_SIZE}");

    static ref SPW_HELP: String =
        format!("The spectral window containing the channels. Default: {DEFAULT_SPW}");

    static ref GRIDDER_HELP: String =
        format!("The tclean gridder. Default: {DEFAULT_GRIDDER}");

    static ref IMSIZE_HELP: String =
        format!("The size of the image [pixels]. Default: {DEFAULT_IMSIZE}");

    static ref CELL_HELP: String =
        format!("The size of a pixel, with units. Default: {DEFAULT_CELL}");

    static ref STOKES_HELP: String =
        format!("The Stokes parameters to image. Default: {DEFAULT_STOKES}");

    static ref NITER_HELP: String =
        format!("The maximum number of clean iterations. Default: {DEFAULT_NITER}");

    static ref USEMASK_HELP: String =
        format!("The tclean masking mode. Default: {DEFAULT_USEMASK}");

    static ref THRESHOLD_HELP: String =
        format!("The clean threshold, with units. Default: {DEFAULT_THRESHOLD}");

    static ref CASA_HELP: String =
        format!("The CASA executable. Default: {DEFAULT_CASA_EXE}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ImageArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The measurement set to image.
    #[clap(short, long, help_heading = "INPUT FILES")]
    pub(super) ms: Option<PathBuf>,

    /// The channel to image. With a channel group size of 8, channel 2 uses
    /// measurement-set channels 16 to 23.
    #[clap(short, long, help_heading = "CHANNEL SELECTION")]
    pub(super) channel_number: Option<usize>,

    #[clap(long, help = CHANNEL_GROUP_SIZE_HELP.as_str(), help_heading = "CHANNEL SELECTION")]
    pub(super) channel_group_size: Option<usize>,

    #[clap(long, help = SPW_HELP.as_str(), help_heading = "CHANNEL SELECTION")]
    pub(super) spw: Option<usize>,

    #[clap(long, help = GRIDDER_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) gridder: Option<String>,

    #[clap(long, help = IMSIZE_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) imsize: Option<usize>,

    #[clap(long, help = CELL_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) cell: Option<String>,

    #[clap(long, help = STOKES_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) stokes: Option<String>,

    #[clap(long, help = NITER_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) niter: Option<usize>,

    #[clap(long, help = USEMASK_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) usemask: Option<String>,

    #[clap(long, help = THRESHOLD_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) threshold: Option<String>,

    #[clap(long, help = CASA_HELP.as_str(), help_heading = "CASA")]
    pub(super) casa: Option<PathBuf>,

    /// The directory to run CASA in. All of its products are written here.
    /// Default: the current directory.
    #[clap(long, help_heading = "CASA")]
    pub(super) work_dir: Option<PathBuf>,

    /// A file for CASA to log to. Default: CASA's own log file.
    #[clap(long, help_heading = "CASA")]
    pub(super) casa_log: Option<PathBuf>,
}

impl ImageArgs {
    /// Merge command-line arguments with those in the argument file (if
    /// any), preferring the command-line arguments.
    pub(super) fn merge(self) -> Result<ImageArgs, ChancubeError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            let ImageArgs {
                args_file: _,
                ms,
                channel_number,
                channel_group_size,
                spw,
                gridder,
                imsize,
                cell,
                stokes,
                niter,
                usemask,
                threshold,
                casa,
                work_dir,
                casa_log,
            } = unpack_arg_file!(arg_file);

            Ok(ImageArgs {
                args_file: None,
                ms: cli_args.ms.or(ms),
                channel_number: cli_args.channel_number.or(channel_number),
                channel_group_size: cli_args.channel_group_size.or(channel_group_size),
                spw: cli_args.spw.or(spw),
                gridder: cli_args.gridder.or(gridder),
                imsize: cli_args.imsize.or(imsize),
                cell: cli_args.cell.or(cell),
                stokes: cli_args.stokes.or(stokes),
                niter: cli_args.niter.or(niter),
                usemask: cli_args.usemask.or(usemask),
                threshold: cli_args.threshold.or(threshold),
                casa: cli_args.casa.or(casa),
                work_dir: cli_args.work_dir.or(work_dir),
                casa_log: cli_args.casa_log.or(casa_log),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<ImagingParams, ChancubeError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            ms,
            channel_number,
            channel_group_size,
            spw,
            gridder,
            imsize,
            cell,
            stokes,
            niter,
            usemask,
            threshold,
            casa,
            work_dir,
            casa_log,
        } = self;

        let ms = ms.ok_or(ImageArgsError::NoMs)?;
        let channel_number = channel_number.ok_or(ImageArgsError::NoChannelNumber)?;
        let mut params = ImagingParams::new(ms, channel_number);
        if let Some(g) = channel_group_size {
            params.channel_group_size =
                NonZeroUsize::new(g).ok_or(ImageArgsError::ZeroChannelGroupSize)?;
        }
        if imsize == Some(0) {
            return Err(ImageArgsError::ZeroImsize.into());
        }

        // Anything not specified keeps its default.
        macro_rules! set {
            ($field:ident) => {
                if let Some(v) = $field {
                    params.$field = v;
                }
            };
        }
        set!(spw);
        set!(gridder);
        set!(imsize);
        set!(cell);
        set!(stokes);
        set!(niter);
        set!(usemask);
        set!(threshold);
        set!(casa);
        set!(work_dir);
        params.casa_log = casa_log;

        if !params.work_dir.is_dir() {
            return Err(ImageArgsError::NoWorkDir(params.work_dir).into());
        }

        Ok(params)
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), ChancubeError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;

        let fits_image = params.run(dry_run)?;
        if !dry_run {
            info!("Image is at {}", fits_image.display());
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum ImageArgsError {
    #[error("No measurement set was supplied; use --ms")]
    NoMs,

    #[error("No channel number was supplied; use --channel-number")]
    NoChannelNumber,

    #[error("The channel group size must be at least 1")]
    ZeroChannelGroupSize,

    #[error("The image size must be at least 1 pixel")]
    ZeroImsize,

    #[error("The work directory {0} doesn't exist")]
    NoWorkDir(PathBuf),
}
