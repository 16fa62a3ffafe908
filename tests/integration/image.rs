// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::{chancube, get_cmd_output};

#[test]
fn test_image_without_casa() {
    let dir = TempDir::new().unwrap();
    #[rustfmt::skip]
    let cmd = chancube()
        .args([
            "image",
            "--ms", "obs.ms",
            "--channel-number", "3",
            "--casa", "chancube-casa-that-does-not-exist",
            "--work-dir", &dir.path().display().to_string(),
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(
        stderr.contains("chancube-casa-that-does-not-exist"),
        "{stderr}"
    );
    assert!(stderr.contains("--casa"), "{stderr}");
}

#[test]
fn test_image_dry_run() {
    let dir = TempDir::new().unwrap();
    #[rustfmt::skip]
    let cmd = chancube()
        .args([
            "image",
            "--ms", "obs.ms",
            "--channel-number", "3",
            "--work-dir", &dir.path().display().to_string(),
            "--dry-run",
            "-v",
        ])
        .ok();
    assert!(cmd.is_ok(), "{}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("spw='0:24~31'"), "{stdout}");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
