//! Firmware version validation.
//!
//! The handshake hands the raw `VER:` field to a [`VersionValidator`], which
//! decides whether the string parses and exposes the minimum version the
//! engine supports. Keeping this behind a trait lets an application swap in
//! vendor-specific numbering without touching the driver.

/// Outcome of parsing a firmware version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionCheck {
    /// Whether the string parsed as a version at all.
    pub is_valid: bool,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionCheck {
    /// Invalid marker with zeroed components.
    pub const INVALID: Self = Self {
        is_valid: false,
        major: 0,
        minor: 0,
        patch: 0,
    };

    fn parts(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }

    /// Whether this version is at least `other`, component-wise.
    pub fn at_least(&self, other: &VersionCheck) -> bool {
        self.parts() >= other.parts()
    }
}

/// Collaborator that parses firmware version strings.
pub trait VersionValidator: Send + Sync {
    /// Parse a version string into its components.
    fn validate(&self, version: &str) -> VersionCheck;

    /// Minimum firmware version this engine supports, in the same format
    /// the device reports.
    fn minimum_version_string(&self) -> String;
}

/// Default validator for `major.minor.patch` firmware versions.
#[derive(Debug, Clone, Default)]
pub struct FirmwareVersionValidator;

impl FirmwareVersionValidator {
    /// Oldest firmware whose capture protocol this engine understands.
    pub const MINIMUM_VERSION: &'static str = "1.1.0";
}

impl VersionValidator for FirmwareVersionValidator {
    fn validate(&self, version: &str) -> VersionCheck {
        let mut parts = version.trim().splitn(3, '.');
        let numbers: Option<(u32, u32, u32)> = (|| {
            let major = parts.next()?.parse().ok()?;
            let minor = parts.next()?.parse().ok()?;
            let patch = parts.next()?.parse().ok()?;
            Some((major, minor, patch))
        })();
        match numbers {
            Some((major, minor, patch)) => VersionCheck {
                is_valid: true,
                major,
                minor,
                patch,
            },
            None => VersionCheck::INVALID,
        }
    }

    fn minimum_version_string(&self) -> String {
        Self::MINIMUM_VERSION.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_version() {
        let check = FirmwareVersionValidator.validate("2.10.3");
        assert!(check.is_valid);
        assert_eq!((check.major, check.minor, check.patch), (2, 10, 3));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let validator = FirmwareVersionValidator;
        assert!(!validator.validate("").is_valid);
        assert!(!validator.validate("2.1").is_valid);
        assert!(!validator.validate("a.b.c").is_valid);
        assert!(!validator.validate("2.1.x").is_valid);
        assert!(!validator.validate("-1.0.0").is_valid);
    }

    #[test]
    fn test_at_least_ordering() {
        let validator = FirmwareVersionValidator;
        let minimum = validator.validate(FirmwareVersionValidator::MINIMUM_VERSION);
        assert!(validator.validate("1.1.0").at_least(&minimum));
        assert!(validator.validate("1.2.0").at_least(&minimum));
        assert!(validator.validate("2.0.0").at_least(&minimum));
        assert!(!validator.validate("1.0.9").at_least(&minimum));
        assert!(!validator.validate("0.9.0").at_least(&minimum));
    }
}
