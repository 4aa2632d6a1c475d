// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-tool version triples.

/// A `major.minor.patch` version, ordered lexicographically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Vers {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl Vers {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Vers {
        Vers {
            major,
            minor,
            patch,
        }
    }

    /// Extract the first `a.b.c` triple from free-form tool output
    /// (e.g. `cmake version 3.22.1`). Suffixes like `-rc1` are ignored.
    pub fn parse(text: &str) -> Option<Vers> {
        text.split_whitespace().find_map(Vers::parse_token)
    }

    fn parse_token(token: &str) -> Option<Vers> {
        let mut parts = token.split('.');
        let major = leading_number(parts.next()?)?;
        let minor = leading_number(parts.next()?)?;
        let patch = leading_number(parts.next()?)?;
        Some(Vers::new(major, minor, patch))
    }
}

impl std::fmt::Display for Vers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn leading_number(part: &str) -> Option<u16> {
    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
#[path = "vers_tests.rs"]
mod tests;
