//! Process-wide plumbing shared by the binary and the library: the opt-in
//! debug log and the crash log.

pub mod logging;

pub use logging::{crash_log_path, init_logging, log_debug, log_file_path, log_panic};
