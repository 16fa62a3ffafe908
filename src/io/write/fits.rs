// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions for creating and updating FITS files.

use std::{ffi::CString, panic::Location, path::Path};

use fitsio::{errors::check_status as fits_check_status, images::ImageDescription, FitsFile};

use crate::io::read::fits::FitsError;

/// Create a new fits file with the described primary image, replacing any
/// file already at `file`.
#[track_caller]
pub(crate) fn fits_create<P: AsRef<Path>>(
    file: P,
    description: &ImageDescription,
) -> Result<FitsFile, FitsError> {
    FitsFile::create(file.as_ref())
        .with_custom_primary(description)
        .overwrite()
        .open()
        .map_err(|e| {
            let caller = Location::caller();
            FitsError::Open {
                fits_error: Box::new(e),
                fits_filename: file.as_ref().to_path_buf().into_boxed_path(),
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            }
        })
}

/// Open a fits file for updating.
#[track_caller]
pub(crate) fn fits_edit<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    FitsFile::edit(file.as_ref()).map_err(|e| {
        let caller = Location::caller();
        FitsError::Open {
            fits_error: Box::new(e),
            fits_filename: file.as_ref().to_path_buf().into_boxed_path(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Update an integer key in the current HDU, or append it if it isn't there.
#[track_caller]
pub(crate) fn fits_update_int(
    fits_fptr: &mut FitsFile,
    key: &str,
    value: i64,
) -> Result<(), FitsError> {
    let caller = Location::caller();
    update_key_int(fits_fptr, key, value)
        .map_err(|e| fitsio_error(fits_fptr, &format!("key {key}"), e, caller))
}

/// Update a string key in the current HDU, or append it if it isn't there.
#[track_caller]
pub(crate) fn fits_update_str(
    fits_fptr: &mut FitsFile,
    key: &str,
    value: &str,
) -> Result<(), FitsError> {
    let caller = Location::caller();
    update_key_str(fits_fptr, key, value)
        .map_err(|e| fitsio_error(fits_fptr, &format!("key {key}"), e, caller))
}

/// Get the byte offset of the current HDU's data section from the start of
/// the file.
#[track_caller]
pub(crate) fn fits_data_offset(fits_fptr: &mut FitsFile) -> Result<u64, FitsError> {
    let caller = Location::caller();
    let mut status = 0;
    let mut head_start = 0i64;
    let mut data_start = 0i64;
    let mut data_end = 0i64;
    unsafe {
        // ffghadll = fits_get_hduaddrll
        fitsio_sys::ffghadll(
            fits_fptr.as_raw(), /* I - FITS file pointer                    */
            &mut head_start,    /* O - byte offset to beginning of CHDU     */
            &mut data_start,    /* O - byte offset to beginning of the data */
            &mut data_end,      /* O - byte offset to beginning of next HDU */
            &mut status,        /* IO - error status                        */
        );
    }
    match fits_check_status(status) {
        Ok(()) => Ok(data_start as u64),
        Err(e) => Err(fitsio_error(fits_fptr, "data offset", e, caller)),
    }
}

fn update_key_int(fits_fptr: &mut FitsFile, key: &str, value: i64) -> fitsio::errors::Result<()> {
    let key_name = CString::new(key)?;
    let mut status = 0;
    unsafe {
        // ffukyj = fits_update_key_lng
        fitsio_sys::ffukyj(
            fits_fptr.as_raw(), /* I - FITS file pointer  */
            key_name.as_ptr(),  /* I - keyword name       */
            value,              /* I - keyword value      */
            std::ptr::null(),   /* I - keyword comment    */
            &mut status,        /* IO - error status      */
        );
    }
    fits_check_status(status)
}

fn update_key_str(fits_fptr: &mut FitsFile, key: &str, value: &str) -> fitsio::errors::Result<()> {
    let key_name = CString::new(key)?;
    let value = CString::new(value)?;
    let mut status = 0;
    unsafe {
        // ffukys = fits_update_key_str
        fitsio_sys::ffukys(
            fits_fptr.as_raw(), /* I - FITS file pointer  */
            key_name.as_ptr(),  /* I - keyword name       */
            value.as_ptr(),     /* I - keyword value      */
            std::ptr::null(),   /* I - keyword comment    */
            &mut status,        /* IO - error status      */
        );
    }
    fits_check_status(status)
}

fn fitsio_error(
    fits_fptr: &FitsFile,
    description: &str,
    e: fitsio::errors::Error,
    caller: &'static Location<'static>,
) -> FitsError {
    FitsError::Fitsio {
        fits_error: Box::new(e),
        fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
        hdu_description: description.into(),
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    }
}
