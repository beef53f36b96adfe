//! Authentication result codes shared by the server and desktop clients.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of an authentication attempt.
///
/// Serialized as its numeric code. The codes are part of the client
/// protocol and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AuthResult {
    /// Authenticated; the user is pinned to a release track.
    SuccessLocked,
    /// Authenticated; the user may run any release.
    SuccessUnlocked,
    /// The client is newer than the user's pinned version.
    FailVersionLocked,
    /// Unknown email or wrong license key.
    FailInvalidCredentials,
    /// The client did not report a usable version.
    FailInvalidVersion,
    /// The user's subscription is not active.
    FailUserInactive,
    /// Anything else.
    FailOther,
}

impl AuthResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::SuccessLocked | Self::SuccessUnlocked)
    }

    /// The stable wire code.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::SuccessLocked => 0,
            Self::SuccessUnlocked => 1,
            Self::FailVersionLocked => 2,
            Self::FailInvalidCredentials => 3,
            Self::FailInvalidVersion => 4,
            Self::FailUserInactive => 5,
            Self::FailOther => 6,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, Error> {
        match code {
            0 => Ok(Self::SuccessLocked),
            1 => Ok(Self::SuccessUnlocked),
            2 => Ok(Self::FailVersionLocked),
            3 => Ok(Self::FailInvalidCredentials),
            4 => Ok(Self::FailInvalidVersion),
            5 => Ok(Self::FailUserInactive),
            6 => Ok(Self::FailOther),
            other => Err(Error::UnknownAuthCode(other)),
        }
    }

    /// Text a client can show the user for a failed attempt.
    #[must_use]
    pub const fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::SuccessLocked | Self::SuccessUnlocked => None,
            Self::FailVersionLocked => Some(
                "Your license does not cover this version. Please download the version your license includes, or renew to get updates.",
            ),
            Self::FailInvalidCredentials => {
                Some("Invalid email or license key. Please check your credentials and try again.")
            }
            Self::FailInvalidVersion => {
                Some("This copy reported an invalid version. Please reinstall the latest release.")
            }
            Self::FailUserInactive => Some(
                "Your subscription is no longer active. Please renew it or contact support for details.",
            ),
            Self::FailOther => Some("An unknown error occurred. Please contact support."),
        }
    }
}

impl From<AuthResult> for u8 {
    fn from(result: AuthResult) -> Self {
        result.code()
    }
}

impl TryFrom<u8> for AuthResult {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl fmt::Display for AuthResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SuccessLocked => "AuthSuccessLocked",
            Self::SuccessUnlocked => "AuthSuccessUnlocked",
            Self::FailVersionLocked => "AuthFailVersionLocked",
            Self::FailInvalidCredentials => "AuthFailInvalidCredentials",
            Self::FailInvalidVersion => "AuthFailInvalidVersion",
            Self::FailUserInactive => "AuthFailUserInactive",
            Self::FailOther => "AuthFailOther",
        };
        f.write_str(name)
    }
}
