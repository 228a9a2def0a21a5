//! Semantic version parsing and precedence checks.

use semver::Version;

/// Parse a strict `MAJOR.MINOR.PATCH[-PRE][+BUILD]` version string.
pub fn parse_version(text: &str) -> Result<Version, semver::Error> {
    Version::parse(text)
}

/// Whether `candidate` strictly succeeds `current`.
///
/// Build metadata carries no precedence, so two versions differing only in
/// their build suffix are never newer than one another.
pub fn is_newer(current: &Version, candidate: &Version) -> bool {
    candidate.cmp_precedence(current).is_gt()
}
