//! Application configuration constants
//!
//! Central location for configuration constants, resource limits,
//! and validation boundaries used throughout the crate.

// ===== Persistent Store =====

/// Fixed primary key of the singleton branding record
pub const BRANDING_KEY: &str = "company";

/// Current schema version. Opening a database recorded at a higher
/// version fails with `VersionConflict`.
pub const SCHEMA_VERSION: i32 = 1;

// ===== Template Authoring Limits =====

/// Minimum number of options a choice question (checkbox/radio/select)
/// must carry. `remove_option` refuses to drop below this.
pub const MIN_CHOICE_OPTIONS: usize = 2;

// ===== Passcode Limits =====

/// Minimum passcode length in digits
pub const MIN_PASSCODE_DIGITS: usize = 4;

/// Maximum passcode length in digits
pub const MAX_PASSCODE_DIGITS: usize = 8;
