//! Exit codes for CLI operations
//!
//! Follows Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - bad source directory or registry configuration
pub const INPUT_ERROR: i32 = 2;

/// Template error - an upstream manifest failed to evaluate
pub const TEMPLATE_ERROR: i32 = 3;

/// Render error - the layout could not be written as requested
pub const RENDER_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
