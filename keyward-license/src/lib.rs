//! License keys for Keyward.
//!
//! A license key is an opaque, high-entropy credential issued once per user
//! and presented together with the user's email when the desktop client
//! authenticates. Keys are meant to be typed by hand, so they use an
//! unambiguous upper-case alphabet and are split into dash-separated groups:
//!
//! ```text
//! 7KQ2XM-0HD4RA-T9VW3N-B5ZC8E-1YPJ6G-MS4F0K
//! ```
//!
//! # Design Principles
//!
//! - **Issued, not derived**: keys are random, carry no payload, and are
//!   never changed once stored.
//! - **Forgiving input**: case, missing dashes and look-alike letters are
//!   normalized before comparison.
//! - **Constant-time comparison**: a presented key is compared against the
//!   stored key without early exit.

mod error;
mod key;

pub use error::{LicenseError, LicenseResult};
pub use key::{LicenseKey, GROUP_COUNT, GROUP_LEN, KEY_ALPHABET};
