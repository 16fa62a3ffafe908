// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Imaging a single channel of a measurement set with CASA's `tclean`.
//!
//! The imaging itself is all done by CASA; here, a small Python script is
//! written for one (averaged) channel, CASA is run on it, and then the
//! intermediate CASA products are removed so that only the exported FITS
//! image (one channel of a future cube) and `tclean`'s return dictionary
//! remain.

mod error;
#[cfg(test)]
mod tests;

pub use error::ImagingError;

use std::{
    fs,
    io::ErrorKind,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    process::Command,
    time::Instant,
};

use log::{debug, info, trace, warn};

use crate::constants::*;
use error::io_error;

/// Everything needed to image one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagingParams {
    /// The measurement set to image.
    pub ms: PathBuf,

    /// The (averaged) channel to image; measurement-set channels
    /// `channel_group_size * channel_number` to
    /// `channel_group_size * (channel_number + 1) - 1` are used.
    pub channel_number: usize,

    pub channel_group_size: NonZeroUsize,
    pub spw: usize,
    pub gridder: String,

    /// [pixels]
    pub imsize: usize,

    pub cell: String,
    pub stokes: String,
    pub niter: usize,
    pub usemask: String,
    pub threshold: String,

    /// The CASA executable.
    pub casa: PathBuf,

    /// Where CASA is run, and therefore where all of its products go.
    pub work_dir: PathBuf,

    /// If set, CASA logs here instead of its default log file.
    pub casa_log: Option<PathBuf>,
}

impl ImagingParams {
    /// Parameters with all of the defaults for imaging `channel_number` of
    /// `ms` in the current directory.
    pub fn new(ms: PathBuf, channel_number: usize) -> ImagingParams {
        ImagingParams {
            ms,
            channel_number,
            channel_group_size: NonZeroUsize::new(DEFAULT_CHANNEL_GROUP_SIZE)
                .expect("default is not zero"),
            spw: DEFAULT_SPW,
            gridder: DEFAULT_GRIDDER.to_string(),
            imsize: DEFAULT_IMSIZE,
            cell: DEFAULT_CELL.to_string(),
            stokes: DEFAULT_STOKES.to_string(),
            niter: DEFAULT_NITER,
            usemask: DEFAULT_USEMASK.to_string(),
            threshold: DEFAULT_THRESHOLD.to_string(),
            casa: PathBuf::from(DEFAULT_CASA_EXE),
            work_dir: PathBuf::from("."),
            casa_log: None,
        }
    }

    /// The base name of everything CASA makes, e.g.
    /// `obs_spw_00_channel_0012` for channel 12 of `/data/obs.ms`.
    pub fn image_name(&self) -> Result<String, ImagingError> {
        let invalid = || ImagingError::InvalidMsName(self.ms.clone());
        let file_name = self
            .ms
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(invalid)?;
        let stem = file_name.strip_suffix(".ms").unwrap_or(file_name);
        if stem.is_empty() {
            return Err(invalid());
        }
        Ok(format!(
            "{stem}_spw_{:02}_channel_{:04}",
            self.spw, self.channel_number
        ))
    }

    /// The CASA spectral-window selection for this channel, e.g. `0:16~23`.
    pub fn spw_selection(&self) -> String {
        let group = self.channel_group_size.get();
        let first = group * self.channel_number;
        let last = group * (self.channel_number + 1) - 1;
        format!("{}:{first}~{last}", self.spw)
    }

    /// The path of the FITS image that CASA exports.
    pub fn fits_image(&self) -> Result<PathBuf, ImagingError> {
        Ok(self.work_dir.join(format!("{}.fits", self.image_name()?)))
    }

    fn script_name(&self) -> Result<String, ImagingError> {
        Ok(format!("{}_tclean.py", self.image_name()?))
    }

    /// The Python script given to CASA. Relative paths in the script are
    /// relative to the work directory.
    pub fn casa_script(&self) -> Result<String, ImagingError> {
        let name = self.image_name()?;
        // CASA doesn't run in our current directory.
        let vis = std::path::absolute(&self.ms).map_err(io_error(&self.ms))?;

        let mut lines = vec![
            "import numpy as np".to_string(),
            "from casatasks import tclean, exportfits, casalog".to_string(),
        ];
        if let Some(log) = &self.casa_log {
            let log = std::path::absolute(log).map_err(io_error(log))?;
            lines.push(format!(
                "casalog.setlogfile({})",
                py_str(&log.display().to_string())
            ));
        }
        lines.push(format!(
            "retdict = tclean(vis={vis}, imagename={imagename}, imsize={imsize}, cell={cell}, \
             specmode='mfs', selectdata=True, spw={spw}, usemask={usemask}, stokes={stokes}, \
             gridder={gridder}, niter={niter}, threshold={threshold}, parallel=False, \
             fullsummary=True)",
            vis = py_str(&vis.display().to_string()),
            imagename = py_str(&name),
            imsize = self.imsize,
            cell = py_str(&self.cell),
            spw = py_str(&self.spw_selection()),
            usemask = py_str(&self.usemask),
            stokes = py_str(&self.stokes),
            gridder = py_str(&self.gridder),
            niter = self.niter,
            threshold = py_str(&self.threshold),
        ));
        lines.push(format!(
            "np.save({}, retdict)",
            py_str(&format!("{name}_retdict.npy"))
        ));
        lines.push(format!(
            "exportfits(imagename={}, fitsimage={}, overwrite=True)",
            py_str(&format!("{name}.image")),
            py_str(&format!("{name}.fits"))
        ));

        let mut script = lines.join("\n");
        script.push('\n');
        Ok(script)
    }

    /// Image the channel. CASA's intermediate products are removed once it
    /// has succeeded. Returns the path to the exported FITS image (which
    /// doesn't exist if this is a dry run).
    pub fn run(&self, dry_run: bool) -> Result<PathBuf, ImagingError> {
        let name = self.image_name()?;
        let script = self.casa_script()?;
        let fits_image = self.fits_image()?;
        let script_name = self.script_name()?;
        let script_path = self.work_dir.join(&script_name);

        info!(
            "Imaging channel {} of {} (spw selection {})",
            self.channel_number,
            self.ms.display(),
            self.spw_selection()
        );
        debug!("CASA script:\n{script}");
        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(fits_image);
        }

        fs::write(&script_path, &script).map_err(io_error(&script_path))?;
        debug!(
            "Running {} --nologger --nogui --log2term -c {script_name} in {}",
            self.casa.display(),
            self.work_dir.display()
        );
        let start = Instant::now();
        let status = Command::new(&self.casa)
            .args(["--nologger", "--nogui", "--log2term", "-c"])
            .arg(&script_name)
            .current_dir(&self.work_dir)
            .status();
        let status = match status {
            Ok(s) => s,
            Err(err) => {
                remove_product(&script_path)?;
                return Err(ImagingError::Spawn {
                    exe: self.casa.clone(),
                    err,
                });
            }
        };
        if !status.success() {
            return Err(ImagingError::CasaFailed {
                name,
                status,
                script: script_path,
            });
        }
        info!("CASA finished imaging {name} in {:?}", start.elapsed());

        self.cleanup()?;
        if !fits_image.exists() {
            warn!("CASA succeeded, but {} doesn't exist", fits_image.display());
        }
        Ok(fits_image)
    }

    /// Remove CASA's intermediate products for this channel, and the script
    /// given to CASA. Missing products are ignored.
    pub fn cleanup(&self) -> Result<(), ImagingError> {
        let name = self.image_name()?;
        for ext in CASA_INTERMEDIATE_EXTENSIONS {
            remove_product(&self.work_dir.join(format!("{name}{ext}")))?;
        }
        remove_product(&self.work_dir.join(self.script_name()?))?;
        Ok(())
    }
}

/// Remove a file or a whole directory (CASA images are directories).
fn remove_product(path: &Path) -> Result<(), ImagingError> {
    let result = match fs::symlink_metadata(path) {
        Ok(m) if m.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(io_error(path))?;
    trace!("Removed {}", path.display());
    Ok(())
}

/// A single-quoted Python string literal.
fn py_str(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
