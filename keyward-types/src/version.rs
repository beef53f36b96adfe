//! Release versions and target platforms.
//!
//! Versions are packed decimal integers `YYMMPP`: `220905` is the fifth
//! patch of the 22.09 release. Comparison is plain integer comparison.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A packed release version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u32);

impl Version {
    #[must_use]
    pub const fn new(packed: u32) -> Self {
        Self(packed)
    }

    /// Returns the packed integer.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Version 0 is what clients send when they could not determine their
    /// own version (missing or unparsable header).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }

    #[must_use]
    pub const fn major(&self) -> u32 {
        self.0 / 10_000
    }

    #[must_use]
    pub const fn minor(&self) -> u32 {
        (self.0 / 100) % 100
    }

    #[must_use]
    pub const fn patch(&self) -> u32 {
        self.0 % 100
    }
}

impl From<u32> for Version {
    fn from(packed: u32) -> Self {
        Self(packed)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}", self.major(), self.minor())?;
        if self.patch() > 0 {
            write!(f, ".{}", self.patch())?;
        }
        Ok(())
    }
}

/// Operating system and architecture a release artifact is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "mac-x64")]
    MacX64,
    #[serde(rename = "mac-arm")]
    MacArm,
    #[serde(rename = "windows-x64")]
    WindowsX64,
    #[serde(rename = "linux-x64")]
    LinuxX64,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::MacX64,
        Platform::MacArm,
        Platform::WindowsX64,
        Platform::LinuxX64,
    ];

    /// The slug used in URLs, artifact names and the wire protocol.
    #[must_use]
    pub const fn as_slug(&self) -> &'static str {
        match self {
            Self::MacX64 => "mac-x64",
            Self::MacArm => "mac-arm",
            Self::WindowsX64 => "windows-x64",
            Self::LinuxX64 => "linux-x64",
        }
    }

    /// The platform this binary was compiled for, if it is a supported one.
    #[must_use]
    pub fn current() -> Option<Self> {
        match (std::env::consts::OS, std::env::consts::ARCH) {
            ("macos", "x86_64") => Some(Self::MacX64),
            ("macos", "aarch64") => Some(Self::MacArm),
            ("windows", "x86_64") => Some(Self::WindowsX64),
            ("linux", "x86_64") => Some(Self::LinuxX64),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_slug())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_slug() == s)
            .ok_or_else(|| Error::UnknownPlatform(s.to_string()))
    }
}
