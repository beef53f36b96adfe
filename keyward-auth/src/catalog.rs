use keyward_types::{Platform, Version};

/// Where release packages are published.
///
/// Update packages live at `{base}/update/{os}-{version}.zip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCatalog {
    base_url: String,
}

impl ReleaseCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Locator of the autoupdate package for `version` on `os`.
    #[must_use]
    pub fn update_url(&self, version: Version, os: Platform) -> String {
        format!("{}/update/{}-{}.zip", self.base_url, os.as_slug(), version)
    }

    /// Locator of the full installer package.
    #[must_use]
    pub fn installer_url(&self, version: Version, os: Platform) -> String {
        format!("{}/app/{}-{}.zip", self.base_url, os.as_slug(), version)
    }
}
