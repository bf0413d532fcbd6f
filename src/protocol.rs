//! Wire protocol: request/status shapes matching the seven opcodes and
//! the error-code contract of SPEC_FULL.md §6.

use crate::registry::{Endpoint, Severity, MAX_NAME_LEN};

/// One of the seven requests a client can send.
#[derive(Clone, Debug)]
pub enum Request {
    Initialize,
    StartLog { logger: String },
    CloseLog { logger: String },
    WriteLog { logger: String, severity: i32, message: Vec<u8> },
    SetSeverity { logger: String, severity: i32 },
    ClearLog { logger: String },
    ClearAll,
}

/// Status codes observable by a client, per SPEC_FULL.md §6/§7. Numeric
/// values are part of the ABI and mirror the original `LS_ERR_*` codes
/// (`OK = 0`; the rest assigned in declaration order exactly as the
/// published header does).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    InitFailed = 1,
    NoSuchLogger = 2,
    LoggerOpen = 3,
    LoggerNotOpen = 4,
    PermissionDenied = 5,
    External = 6,
    Invalid = 7,
}

impl Status {
    pub fn to_wire(self) -> i32 {
        self as i32
    }
}

/// An envelope pairs an inbound request with the endpoint that sent it.
/// This is the unit the [`crate::transport::Transport`] trait moves
/// around; it stands in for a kernel IPC message plus its implicit
/// sender field.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub source: Endpoint,
    pub request: Request,
}

/// Validates that a logger name satisfies the wire-level length
/// constraint (`bytes[32]` NUL-terminated, i.e. at most 31 usable
/// bytes). The dispatcher checks this before routing, per SPEC_FULL.md
/// §4.F's "clients enforce this, but server re-checks".
pub fn validate_name(name: &str) -> Result<(), Status> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(Status::Invalid);
    }
    Ok(())
}

/// Validates a wire severity integer, converting it to a [`Severity`] or
/// rejecting it as `EINVAL` (boundary behavior in SPEC_FULL.md §8: "4+
/// or negative is EINVAL").
pub fn validate_severity(level: i32) -> Result<Severity, Status> {
    Severity::from_wire(level).ok_or(Status::Invalid)
}

/// Validates a message body length against the wire constant (§6: "per-
/// message body ≤2048"). Boundary: 2048 accepted, 2049+ rejected.
pub fn validate_msg_len(len: usize) -> Result<(), Status> {
    if len > crate::registry::MAX_MESSAGE_LEN {
        return Err(Status::Invalid);
    }
    Ok(())
}
