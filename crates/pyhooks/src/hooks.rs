//! The standardized hook table.
//!
//! Each hook is described by its wire name, whether a backend must define it,
//! and what the driver does when it does not. The embedded driver carries the
//! same table; `tests::test_driver_table_matches` keeps the two in step.

use std::fmt;
use std::str::FromStr;

/// A standardized build-backend hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Dependencies needed to build a wheel.
    GetRequiresForBuildWheel,
    /// Dependencies needed to build an sdist.
    GetRequiresForBuildSdist,
    /// Dependencies needed to build an editable wheel.
    GetRequiresForBuildEditable,
    /// Write a `.dist-info` directory without building a wheel.
    PrepareMetadataForBuildWheel,
    /// Write a `.dist-info` directory for an editable install.
    PrepareMetadataForBuildEditable,
    /// Build a wheel.
    BuildWheel,
    /// Build an editable wheel.
    BuildEditable,
    /// Build a source distribution.
    BuildSdist,
    /// Capabilities of the backend, answered by the driver.
    SupportedFeatures,
}

/// What the driver does when the backend does not define a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultBehavior {
    /// Report `hook_missing`.
    Missing,
    /// Return an empty requirement list.
    NoRequirements,
    /// Build a wheel and extract its metadata if the caller allows it,
    /// otherwise report `hook_missing`.
    MetadataFromWheel,
    /// Computed by the driver itself from the backend's attributes.
    Driver,
}

impl Hook {
    /// Every hook the driver understands.
    pub const ALL: [Hook; 9] = [
        Hook::GetRequiresForBuildWheel,
        Hook::GetRequiresForBuildSdist,
        Hook::GetRequiresForBuildEditable,
        Hook::PrepareMetadataForBuildWheel,
        Hook::PrepareMetadataForBuildEditable,
        Hook::BuildWheel,
        Hook::BuildEditable,
        Hook::BuildSdist,
        Hook::SupportedFeatures,
    ];

    /// Returns the wire name of this hook.
    pub fn name(&self) -> &'static str {
        match self {
            Hook::GetRequiresForBuildWheel => "get_requires_for_build_wheel",
            Hook::GetRequiresForBuildSdist => "get_requires_for_build_sdist",
            Hook::GetRequiresForBuildEditable => "get_requires_for_build_editable",
            Hook::PrepareMetadataForBuildWheel => "prepare_metadata_for_build_wheel",
            Hook::PrepareMetadataForBuildEditable => "prepare_metadata_for_build_editable",
            Hook::BuildWheel => "build_wheel",
            Hook::BuildEditable => "build_editable",
            Hook::BuildSdist => "build_sdist",
            Hook::SupportedFeatures => "_supported_features",
        }
    }

    /// Returns what the driver substitutes when the backend lacks this hook.
    pub fn default_behavior(&self) -> DefaultBehavior {
        match self {
            Hook::GetRequiresForBuildWheel
            | Hook::GetRequiresForBuildSdist
            | Hook::GetRequiresForBuildEditable => DefaultBehavior::NoRequirements,
            Hook::PrepareMetadataForBuildWheel | Hook::PrepareMetadataForBuildEditable => {
                DefaultBehavior::MetadataFromWheel
            }
            Hook::BuildWheel | Hook::BuildEditable | Hook::BuildSdist => DefaultBehavior::Missing,
            Hook::SupportedFeatures => DefaultBehavior::Driver,
        }
    }

    /// Returns true if a missing hook is a `hook_missing` failure.
    ///
    /// `build_editable` is optional at declaration time (backends advertise it
    /// through `_supported_features`) but has no default.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Hook::BuildWheel | Hook::BuildSdist)
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown hook name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown hook '{0}'")]
pub struct UnknownHook(pub String);

impl FromStr for Hook {
    type Err = UnknownHook;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hook::ALL
            .into_iter()
            .find(|hook| hook.name() == s)
            .ok_or_else(|| UnknownHook(s.to_string()))
    }
}
