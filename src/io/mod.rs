// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File stuff (reading and writing FITS files, globs).

mod glob;
pub(crate) mod read;
pub(crate) mod write;

pub use self::glob::{
    get_all_matches_from_glob, get_sorted_matches_from_glob, natural_cmp, natural_sort, GlobError,
};
