//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | Error (unreadable data, rejected mutator, failed stage)  |
//! | 2    | Usage error (bad arguments, unknown column, bad config)  |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - loading, building or mutating the table failed.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments or an unusable settings file.
pub const EXIT_USAGE: u8 = 2;
