// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn ordinal_ordering() {
    assert!(MacosVersion::Leopard < MacosVersion::Catalina);
    assert!(MacosVersion::Catalina < MacosVersion::BigSur);
    assert!(MacosVersion::Sonoma < MacosVersion::Sequoia);
}

#[test]
fn from_tags_picks_first_release_tag() {
    let tags = vec![
        "x64".to_string(),
        "sonoma".to_string(),
        "catalina".to_string(),
    ];
    assert_eq!(MacosVersion::from_tags(&tags), Some(MacosVersion::Sonoma));
}

#[test]
fn from_tags_without_release_tag() {
    let tags = vec!["x64".to_string(), "msvc2022".to_string()];
    assert_eq!(MacosVersion::from_tags(&tags), None);
}

#[parameterized(
    bigsur_boots_old = { MacosVersion::BigSur, MacosVersion::SnowLeopard, true },
    sequoia_boots_anything = { MacosVersion::Sequoia, MacosVersion::Sonoma, true },
    old_boots_catalina = { MacosVersion::Sierra, MacosVersion::Catalina, true },
    catalina_cannot_boot_bigsur = { MacosVersion::Catalina, MacosVersion::BigSur, false },
    mojave_cannot_boot_ventura = { MacosVersion::Mojave, MacosVersion::Ventura, false },
)]
fn boot_compatibility(from: MacosVersion, to: MacosVersion, expected: bool) {
    assert_eq!(MacosVersion::can_boot_direct(from, to), expected);
}
