// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Functions to glob files, and to sort them "naturally", i.e. so that
//! `chan_9.fits` comes before `chan_10.fits`.

use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use glob::glob;
use regex::Regex;
use thiserror::Error;

lazy_static::lazy_static! {
    /// Runs of ASCII digits, and runs of everything else.
    static ref NATURAL_CHUNKS: Regex = Regex::new("[0-9]+|[^0-9]+").unwrap();
}

/// Given a glob pattern, get all of the matches from the filesystem.
pub fn get_all_matches_from_glob(g: &str) -> Result<Vec<PathBuf>, GlobError> {
    let mut entries = vec![];
    for entry in glob(g)? {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => return Err(GlobError::GlobCrate(e)),
        }
    }
    Ok(entries)
}

/// The same as `get_all_matches_from_glob`, but the matches are sorted
/// naturally. If there are no matches, an error is returned.
pub fn get_sorted_matches_from_glob(g: &str) -> Result<Vec<PathBuf>, GlobError> {
    let mut entries = get_all_matches_from_glob(g)?;
    if entries.is_empty() {
        return Err(GlobError::NoMatches {
            glob: g.to_string(),
        });
    }
    natural_sort(&mut entries);
    Ok(entries)
}

/// Sort paths naturally.
pub fn natural_sort<P: AsRef<Path>>(paths: &mut [P]) {
    paths.sort_by(|a, b| {
        natural_cmp(
            &a.as_ref().to_string_lossy(),
            &b.as_ref().to_string_lossy(),
        )
    });
}

/// Compare strings chunk by chunk. Runs of digits are compared as integers,
/// and come before any other text; other text is compared case-insensitively.
/// Strings that are otherwise equal (e.g. "a01" and "a1", or "A" and "a") are
/// compared normally.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chunks = NATURAL_CHUNKS.find_iter(a);
    let mut b_chunks = NATURAL_CHUNKS.find_iter(b);
    loop {
        match (a_chunks.next(), b_chunks.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match cmp_chunks(x.as_str(), y.as_str()) {
                Ordering::Equal => (),
                o => return o,
            },
        }
    }
}

fn cmp_chunks(x: &str, y: &str) -> Ordering {
    let is_number = |s: &str| s.as_bytes()[0].is_ascii_digit();
    match (is_number(x), is_number(y)) {
        (true, true) => {
            // Arbitrarily long numbers can't overflow this way.
            let x = x.trim_start_matches('0');
            let y = y.trim_start_matches('0');
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x.to_lowercase().cmp(&y.to_lowercase()),
    }
}

#[derive(Error, Debug)]
/// Error type associated with glob helper functions.
pub enum GlobError {
    #[error("No glob matches were found for {glob}")]
    NoMatches { glob: String },

    #[error(transparent)]
    GlobCrate(#[from] glob::GlobError),

    #[error(transparent)]
    PatternError(#[from] glob::PatternError),
}
