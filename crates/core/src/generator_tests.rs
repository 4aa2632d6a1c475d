// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    vs2022 = { "Visual Studio 17 2022", Generator::VisualStudio },
    vs2010 = { "Visual Studio 10 2010", Generator::VisualStudio },
    ninja = { "Ninja", Generator::Ninja },
    ninja_multi = { "Ninja Multi-Config", Generator::NinjaMultiConfig },
    mingw = { "MinGW Makefiles", Generator::Mingw },
    msys = { "MSYS Makefiles", Generator::Msys },
    unix = { "Unix Makefiles", Generator::UnixMakefiles },
    xcode = { "Xcode", Generator::Xcode },
)]
fn classify_known(name: &str, expected: Generator) {
    assert_eq!(Generator::classify(name), Some(expected));
}

#[test]
fn classify_unknown() {
    assert_eq!(Generator::classify("Borland Makefiles"), None);
    assert_eq!(Generator::classify(""), None);
}

#[test]
fn multi_config_discipline() {
    assert!(Generator::VisualStudio.is_multi_config());
    assert!(Generator::NinjaMultiConfig.is_multi_config());
    assert!(Generator::Xcode.is_multi_config());
    assert!(!Generator::Ninja.is_multi_config());
    assert!(!Generator::Mingw.is_multi_config());
    assert!(!Generator::UnixMakefiles.is_multi_config());
}
