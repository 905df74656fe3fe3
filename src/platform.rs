//! Static device catalog mapping platform names to their numeric ids.
//!
//! Only public platforms are valid build targets; internal platforms
//! (e.g. `gcc`) are listed so they can be rejected with a specific
//! message rather than "unknown".

use crate::error::{ActionError, Result};

/// A hardware platform known to the build system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub name: &'static str,
    pub id: u32,
    pub public: bool,
}

/// The device constants table. Ordered by platform id.
pub const PLATFORMS: &[Platform] = &[
    Platform { name: "core", id: 0, public: true },
    Platform { name: "gcc", id: 3, public: false },
    Platform { name: "photon", id: 6, public: true },
    Platform { name: "p1", id: 8, public: true },
    Platform { name: "electron", id: 10, public: true },
    Platform { name: "argon", id: 12, public: true },
    Platform { name: "boron", id: 13, public: true },
    Platform { name: "xenon", id: 14, public: true },
    Platform { name: "esomx", id: 15, public: true },
    Platform { name: "bsom", id: 23, public: true },
    Platform { name: "b5som", id: 25, public: true },
    Platform { name: "tracker", id: 26, public: true },
    Platform { name: "trackerm", id: 28, public: true },
    Platform { name: "p2", id: 32, public: true },
    Platform { name: "newhal", id: 60000, public: false },
];

fn lookup(name: &str) -> Option<&'static Platform> {
    PLATFORMS.iter().find(|p| p.name == name)
}

/// Resolve a platform name to its numeric id.
///
/// Unknown names and non-public platforms are hard input-validation
/// failures.
pub fn platform_id(name: &str) -> Result<u32> {
    match lookup(name) {
        Some(p) if p.public => Ok(p.id),
        Some(p) => Err(ActionError::Validation(format!(
            "Platform '{}' is not a public platform",
            p.name
        ))),
        None => Err(ActionError::Validation(format!(
            "Platform '{name}' is not supported"
        ))),
    }
}

/// Validate a platform name, returning `true` or a validation error.
pub fn validate_platform_name(name: &str) -> Result<bool> {
    platform_id(name).map(|_| true)
}
