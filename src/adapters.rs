//! External adapters (SPEC_FULL.md §4.G, §9): the collaborators this
//! crate treats as out-of-scope interfaces — the clock, the process
//! table, cross-address-space copy, and the filesystem. Each is a trait
//! so that [`crate::handlers::Server`] can be driven in tests with stub
//! implementations, per spec.md §9's explicit recommendation.

use crate::registry::Endpoint;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Source of the current time, used by the `%t` format placeholder.
pub trait Clock {
    /// Returns the current UTC time, or `None` if the clock is
    /// unavailable (mirrors `put_time`'s fallback to `unknown-time` in
    /// the original `log.c`).
    fn now(&self) -> Option<DateTime<Utc>>;
}

/// The system clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Option<DateTime<Utc>> {
        Some(Utc::now())
    }
}

/// Maps a client endpoint to a human-readable process name, standing in
/// for the process manager's table lookup.
pub trait ProcessTable {
    /// Refreshes the cached table snapshot. Called on initialize and
    /// after each successful `start_log`, per SPEC_FULL.md §4.F.
    fn refresh(&mut self) -> io::Result<()>;

    /// Looks up the process name for `endpoint`, if known.
    fn name_of(&self, endpoint: Endpoint) -> Option<&str>;
}

/// A process table backed by an in-process registration map: processes
/// announce their own name, standing in for the kernel's process
/// manager. This is the natural stand-in given the transport itself
/// (§10) is an in-process channel rather than a real kernel IPC socket.
#[derive(Default)]
pub struct InMemoryProcessTable {
    names: HashMap<Endpoint, String>,
}

impl InMemoryProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, endpoint: Endpoint, name: impl Into<String>) {
        self.names.insert(endpoint, name.into());
    }
}

impl ProcessTable for InMemoryProcessTable {
    fn refresh(&mut self) -> io::Result<()> {
        // Nothing to refresh from: entries are pushed in by `register`
        // as processes announce themselves. A real transport backed by
        // kernel IPC would re-read `getsysinfo(PM_PROC_NR, ...)` here.
        Ok(())
    }

    fn name_of(&self, endpoint: Endpoint) -> Option<&str> {
        self.names.get(&endpoint).map(|s| s.as_str())
    }
}

/// Copies a message body out of a client's address space into a local
/// buffer. Modeled as an explicit capability (spec.md §9) so tests can
/// inject a stub without any real cross-address-space mechanism.
pub trait CopyIn {
    /// Copies `len` bytes belonging to `endpoint` at the client-supplied
    /// location into `buf`. `buf` is truncated/extended to exactly `len`
    /// bytes on success.
    fn copy_from(&self, endpoint: Endpoint, message: &[u8], len: usize, buf: &mut Vec<u8>) -> io::Result<()>;
}

/// The production copy-in adapter. Since the transport (§10) is an
/// in-process channel rather than real separate address spaces, the
/// "copy" is simply a byte-slice clamp; a real kernel-backed transport
/// would issue `sys_vircopy` here instead.
pub struct DirectCopyIn;

impl CopyIn for DirectCopyIn {
    fn copy_from(&self, _endpoint: Endpoint, message: &[u8], len: usize, buf: &mut Vec<u8>) -> io::Result<()> {
        if len > message.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "message shorter than msg_len"));
        }
        buf.clear();
        buf.extend_from_slice(&message[..len]);
        Ok(())
    }
}

/// Filesystem operations needed by the request handlers: open for
/// writing (with append-or-truncate), write, fsync, close, and
/// truncate-via-reopen.
pub trait Filesystem {
    fn open_for_write(&self, path: &Path, append: bool) -> io::Result<File>;
    fn write_all(&self, file: &mut File, data: &[u8]) -> io::Result<()>;
    fn sync(&self, file: &mut File) -> io::Result<()>;
    /// Truncates the file at `path` to zero length, creating it if
    /// absent, then closes it (mirrors `do_clear_log`'s
    /// open-with-O_TRUNC-then-close).
    fn truncate(&self, path: &Path) -> io::Result<()>;
}

/// The real, `std::fs`-backed filesystem adapter.
pub struct RealFilesystem;

impl Filesystem for RealFilesystem {
    fn open_for_write(&self, path: &Path, append: bool) -> io::Result<File> {
        let mut opts = OpenOptions::new();
        opts.write(true).create(true);
        if append {
            opts.append(true);
        } else {
            opts.truncate(true);
        }
        opts.open(path)
    }

    fn write_all(&self, file: &mut File, data: &[u8]) -> io::Result<()> {
        file.write_all(data)
    }

    fn sync(&self, file: &mut File) -> io::Result<()> {
        file.sync_all()
    }

    fn truncate(&self, path: &Path) -> io::Result<()> {
        OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        Ok(())
    }
}
