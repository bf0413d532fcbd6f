/// Error types used across this crate's own bootstrap path.
///
/// These are distinct from the wire-level [`crate::protocol::Status`]
/// codes, which are never surfaced through a `Result` — every request
/// gets exactly one reply carrying a status, success or failure alike.
/// `Failed`/`ExitError` instead govern what happens when the daemon
/// itself fails to start: a bad CLI argument, a config file that can't
/// even be opened before the dispatcher loop begins, or a failure to
/// install the diagnostic logger.

use log::error;


//------------ Failed --------------------------------------------------------

/// An operation has failed to complete.
///
/// This error type is used to indicate that an operation has failed,
/// diagnostic information has been printed or logged, and the caller can’t
/// really do anything to recover.
#[derive(Clone, Copy, Debug)]
pub struct Failed;


//------------ ExitError -----------------------------------------------------

/// An error happened that should lead to terminating the program.
#[derive(Clone, Copy, Debug)]
pub enum ExitError {
    /// Something has happened.
    ///
    /// This should be exit status 1.
    Generic,

    /// The configuration file could not be read or parsed at startup.
    ///
    /// This should be exit status 2.
    BadConfig,
}

impl From<Failed> for ExitError {
    fn from(_: Failed) -> ExitError {
        error!("Fatal error. Exiting.");
        ExitError::Generic
    }
}
