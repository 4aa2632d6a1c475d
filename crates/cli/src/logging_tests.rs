// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn logfile_name_is_timestamped() {
    let date = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 0).unwrap();
    assert_eq!(logfile_name(&date), "2026_03_07_09_05_log.txt");
}
