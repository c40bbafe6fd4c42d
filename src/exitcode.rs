//! Process exit codes (BSD sysexits.h values)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error, or a snapshot that does not exist
pub const USAGE: i32 = 64;

/// Snapshot content failed parsing or integrity checks
pub const DATAERR: i32 = 65;

/// Referenced node does not exist
pub const NOINPUT: i32 = 66;

/// Snapshot or record file could not be read or written
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;
