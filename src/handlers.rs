//! Request handler semantics (SPEC_FULL.md §4.F). [`Server`] owns the
//! registry and the external adapters and exposes one method per opcode;
//! [`crate::dispatcher`] routes incoming requests to these methods.

use crate::adapters::{Clock, CopyIn, Filesystem, ProcessTable};
use crate::format::{self, RenderContext};
use crate::registry::{Destination, Endpoint, Registry, Severity, MAX_MESSAGE_LEN};
use crate::protocol::Status;
use log::{debug, info, warn};
use std::path::PathBuf;

/// Owns the registry, the config file path it was built from, and the
/// external adapters. `registry` is `None` until the first successful
/// initialize — spec.md §9's recommendation to model "initialized?" as
/// a nullable handle rather than a separate boolean.
pub struct Server<C, P, X, F> {
    config_path: PathBuf,
    registry: Option<Registry>,
    clock: C,
    process_table: P,
    copy_in: X,
    fs: F,
}

impl<C: Clock, P: ProcessTable, X: CopyIn, F: Filesystem> Server<C, P, X, F> {
    pub fn new(config_path: PathBuf, clock: C, process_table: P, copy_in: X, fs: F) -> Self {
        Server { config_path, registry: None, clock, process_table, copy_in, fs }
    }

    /// Ensures the registry has been built at least once, lazily
    /// invoking `initialize` on first use. Deliberately does not return
    /// a reference: callers project `self.registry` directly afterward,
    /// keeping that borrow disjoint from `self.fs`/`self.process_table`/
    /// `self.clock`/`self.copy_in` for the rest of the handler body.
    fn ensure_initialized(&mut self) -> Result<(), Status> {
        if self.registry.is_none() {
            self.initialize()?;
        }
        Ok(())
    }

    /// **initialize**: frees any existing registry, re-parses the config
    /// file, refreshes the process-table snapshot.
    pub fn initialize(&mut self) -> Result<(), Status> {
        info!("parsing config file '{}'", self.config_path.display());
        let file = std::fs::File::open(&self.config_path).map_err(|err| {
            warn!("failed opening config file '{}': {}", self.config_path.display(), err);
            Status::InitFailed
        })?;
        let defs = crate::parser::parse_all(file).map_err(|err| {
            warn!("config parse error: {}", err);
            Status::InitFailed
        })?;
        let n = defs.len();
        self.registry = Some(Registry::from_defs(defs));
        self.process_table.refresh().map_err(|err| {
            warn!("failed to refresh process table: {}", err);
            Status::InitFailed
        })?;
        info!("successfully parsed config file and registered {} loggers", n);
        Ok(())
    }

    /// **start_log**: opens the logger for `caller`'s exclusive use.
    pub fn start_log(&mut self, name: &str, caller: Endpoint) -> Status {
        info!("starting logger '{}' by {}", name, caller);
        if let Err(s) = self.ensure_initialized() {
            return s;
        }
        let entry = match self.registry.as_mut().expect("just initialized").find_mut(name) {
            Some(e) => e,
            None => {
                warn!("logger not found: '{}'", name);
                return Status::NoSuchLogger;
            }
        };
        if entry.state.is_open {
            warn!("logger already open: '{}'", name);
            return Status::LoggerOpen;
        }

        if entry.def.destination == Destination::File {
            let path = entry.def.filename.as_deref().expect("file destination always has a filename");
            match self.fs.open_for_write(std::path::Path::new(path), entry.def.append) {
                Ok(file) => entry.state.fd = Some(file),
                Err(err) => {
                    warn!("failed to open file '{}' for logger '{}': {}", path, name, err);
                    return Status::External;
                }
            }
        }

        entry.state.current_severity = entry.def.default_severity;
        entry.state.is_open = true;
        entry.state.opened_by = Some(caller);
        info!("opened logger '{}' with severity {}", name, entry.state.current_severity.as_str());

        if let Err(err) = self.process_table.refresh() {
            warn!("failed to refresh process table after start_log: {}", err);
            return Status::External;
        }
        Status::Ok
    }

    /// **close_log**: only the opener may close. On fs-close failure the
    /// state transition still completes and `OK` is returned — resolved
    /// Open Question, SPEC_FULL.md §12.2.
    pub fn close_log(&mut self, name: &str, caller: Endpoint) -> Status {
        info!("closing logger '{}' by {}", name, caller);
        if let Err(s) = self.ensure_initialized() {
            return s;
        }
        let entry = match self.registry.as_mut().expect("just initialized").find_mut(name) {
            Some(e) => e,
            None => {
                warn!("logger not found: '{}'", name);
                return Status::NoSuchLogger;
            }
        };
        if !entry.state.is_open {
            warn!("logger '{}' is not open, but closing was requested", name);
            return Status::LoggerNotOpen;
        }
        if entry.state.opened_by != Some(caller) {
            warn!("closing of logger '{}' requested by {}, but it is not the owner", name, caller);
            return Status::PermissionDenied;
        }

        if let Some(mut file) = entry.state.fd.take() {
            if let Err(err) = self.fs.sync(&mut file) {
                warn!("failed to close file for logger '{}': {}", name, err);
            }
        }

        entry.state.is_open = false;
        entry.state.opened_by = None;
        entry.state.fd = None;
        Status::Ok
    }

    /// **write_log**: copies the message in, drops it silently if below
    /// threshold, otherwise renders and emits to the sink.
    pub fn write_log(&mut self, name: &str, severity: Severity, message_src: &[u8], msg_len: usize, caller: Endpoint) -> Status {
        debug!("writing to logger '{}' from {}", name, caller);
        if let Err(s) = self.ensure_initialized() {
            return s;
        }
        let entry = match self.registry.as_mut().expect("just initialized").find_mut(name) {
            Some(e) => e,
            None => {
                warn!("logger not found: '{}'", name);
                return Status::NoSuchLogger;
            }
        };
        if !entry.state.is_open {
            warn!("logger not open: '{}'", name);
            return Status::LoggerNotOpen;
        }
        if entry.state.opened_by != Some(caller) {
            warn!("{} tried to log through logger '{}', but it is not the owner", caller, name);
            return Status::PermissionDenied;
        }

        let mut msg_buf = Vec::with_capacity(msg_len.min(MAX_MESSAGE_LEN));
        if let Err(err) = self.copy_in.copy_from(caller, message_src, msg_len, &mut msg_buf) {
            warn!("copying from caller address space failed: {}", err);
            return Status::External;
        }

        if severity < entry.state.current_severity {
            debug!("ignored message for logger '{}' due to its severity ({})", name, severity.as_str());
            return Status::Ok;
        }

        let process_name = entry.state.opened_by.and_then(|ep| self.process_table.name_of(ep));
        let ctx = RenderContext {
            severity: severity.as_str(),
            timestamp: self.clock.now(),
            process_name,
            message: &msg_buf,
        };
        let mut rendered = Vec::new();
        format::render(&entry.def.format, &ctx, &mut rendered, 4096);

        match entry.def.destination {
            Destination::File => {
                let file = entry.state.fd.as_mut().expect("open file-destination logger always has an fd");
                if let Err(err) = self.fs.write_all(file, &rendered) {
                    warn!("failed writing log line for logger '{}': {}", name, err);
                    return Status::External;
                }
                if let Err(err) = self.fs.sync(file) {
                    warn!("fsync failed for logger '{}': {}", name, err);
                    return Status::External;
                }
            }
            Destination::Stdout => {
                use std::io::Write;
                let _ = std::io::stdout().write_all(&rendered);
            }
            Destination::Stderr => {
                use std::io::Write;
                let _ = std::io::stderr().write_all(&rendered);
            }
        }
        Status::Ok
    }

    /// **set_severity**: only when closed.
    pub fn set_severity(&mut self, name: &str, severity: Severity) -> Status {
        info!("setting severity of logger '{}' to {}", name, severity.as_str());
        if let Err(s) = self.ensure_initialized() {
            return s;
        }
        let entry = match self.registry.as_mut().expect("just initialized").find_mut(name) {
            Some(e) => e,
            None => {
                warn!("logger not found: '{}'", name);
                return Status::NoSuchLogger;
            }
        };
        if entry.state.is_open {
            warn!("cannot set severity for logger '{}' because it is open", name);
            return Status::LoggerOpen;
        }
        entry.state.current_severity = severity;
        Status::Ok
    }

    /// **clear_log**: truncates a file-destination logger; no-op for
    /// others.
    pub fn clear_log(&mut self, name: &str) -> Status {
        info!("clearing log for logger '{}'", name);
        if let Err(s) = self.ensure_initialized() {
            return s;
        }
        let entry = match self.registry.as_mut().expect("just initialized").find_mut(name) {
            Some(e) => e,
            None => {
                warn!("logger not found: '{}'", name);
                return Status::NoSuchLogger;
            }
        };
        if entry.state.is_open {
            warn!("cannot clear log for '{}' as it is open", name);
            return Status::LoggerOpen;
        }
        if entry.def.destination == Destination::File {
            let path = entry.def.filename.as_deref().expect("file destination always has a filename");
            if let Err(err) = self.fs.truncate(std::path::Path::new(path)) {
                warn!("failed to truncate file '{}' for logger '{}': {}", path, name, err);
                return Status::External;
            }
        }
        Status::Ok
    }

    /// **clear_all**: iterates the whole registry, never short-circuits.
    /// Aggregates per SPEC_FULL.md §12.3: `LOGGER_OPEN` takes precedence
    /// over any other non-OK status; otherwise the first non-OK status
    /// encountered is reported.
    pub fn clear_all(&mut self) -> Status {
        info!("clearing all logs");
        if let Err(s) = self.ensure_initialized() {
            return s;
        }
        let names: Vec<String> = self
            .registry
            .as_ref()
            .expect("just initialized")
            .iter()
            .map(|e| e.def.name.clone())
            .collect();
        let mut result = Status::Ok;
        for name in names {
            let status = self.clear_log(&name);
            if status != Status::Ok {
                if status == Status::LoggerOpen || result == Status::Ok {
                    result = status;
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Clock, CopyIn, Filesystem, ProcessTable};
    use crate::registry::Endpoint;
    use chrono::{DateTime, Utc};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::{self, Write};
    use std::path::Path;

    struct FixedClock;
    impl Clock for FixedClock {
        fn now(&self) -> Option<DateTime<Utc>> {
            None
        }
    }

    #[derive(Default)]
    struct StubProcessTable;
    impl ProcessTable for StubProcessTable {
        fn refresh(&mut self) -> io::Result<()> {
            Ok(())
        }
        fn name_of(&self, _: Endpoint) -> Option<&str> {
            Some("test-proc")
        }
    }

    struct StubCopyIn;
    impl CopyIn for StubCopyIn {
        fn copy_from(&self, _: Endpoint, message: &[u8], len: usize, buf: &mut Vec<u8>) -> io::Result<()> {
            buf.clear();
            buf.extend_from_slice(&message[..len.min(message.len())]);
            Ok(())
        }
    }

    /// In-memory filesystem stub keyed by path, so tests never touch disk.
    #[derive(Default)]
    struct MemFs {
        files: RefCell<HashMap<String, Vec<u8>>>,
    }
    impl Filesystem for MemFs {
        fn open_for_write(&self, path: &Path, append: bool) -> io::Result<std::fs::File> {
            let key = path.to_string_lossy().to_string();
            let mut files = self.files.borrow_mut();
            if !append {
                files.insert(key, Vec::new());
            } else {
                files.entry(key).or_insert_with(Vec::new);
            }
            // Handlers only need an `fd`-shaped handle to carry; since
            // this stub tracks content in `files` keyed by path, we
            // hand back a tempfile as a placeholder handle.
            tempfile::tempfile()
        }
        fn write_all(&self, _file: &mut std::fs::File, _data: &[u8]) -> io::Result<()> {
            Ok(())
        }
        fn sync(&self, _file: &mut std::fs::File) -> io::Result<()> {
            Ok(())
        }
        fn truncate(&self, path: &Path) -> io::Result<()> {
            self.files.borrow_mut().insert(path.to_string_lossy().to_string(), Vec::new());
            Ok(())
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("logs.conf");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn server(path: PathBuf) -> Server<FixedClock, StubProcessTable, StubCopyIn, MemFs> {
        Server::new(path, FixedClock, StubProcessTable::default(), StubCopyIn, MemFs::default())
    }

    const SAMPLE_CONF: &str = "logger FileLogger1 {\n\
        destination = file\n\
        filename = /var/log/file1.log\n\
        severity = info\n\
        format = [%t] %l %n: %m\n\
        append = true\n\
        }\n\
        logger StdoutLogger1 {\n\
        destination = stdout\n\
        format = %m\n\
        }\n";

    #[test]
    fn scenario_1_initialize_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        assert_eq!(s.initialize(), Ok(()));
    }

    #[test]
    fn scenario_2_start_then_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        let ep = Endpoint(1);
        assert_eq!(s.start_log("FileLogger1", ep), Status::Ok);
        assert_eq!(s.close_log("FileLogger1", ep), Status::Ok);
    }

    #[test]
    fn scenario_3_start_undeclared_logger() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        assert_eq!(s.start_log("my_log", Endpoint(1)), Status::NoSuchLogger);
    }

    #[test]
    fn scenario_4_close_without_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        assert_eq!(s.close_log("StdoutLogger1", Endpoint(1)), Status::LoggerNotOpen);
    }

    #[test]
    fn scenario_5_double_start_same_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        let ep = Endpoint(1);
        assert_eq!(s.start_log("StdoutLogger1", ep), Status::Ok);
        assert_eq!(s.start_log("StdoutLogger1", ep), Status::LoggerOpen);
    }

    #[test]
    fn scenario_7_set_severity_while_open_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        let ep = Endpoint(1);
        s.start_log("FileLogger1", ep);
        assert_eq!(s.set_severity("FileLogger1", Severity::Trace), Status::LoggerOpen);
    }

    #[test]
    fn scenario_8_set_severity_then_write_at_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        let ep = Endpoint(1);
        s.start_log("FileLogger1", ep);
        assert_eq!(s.close_log("FileLogger1", ep), Status::Ok);
        assert_eq!(s.set_severity("FileLogger1", Severity::Trace), Status::Ok);
        assert_eq!(s.start_log("FileLogger1", ep), Status::Ok);
        assert_eq!(s.write_log("FileLogger1", Severity::Trace, b"hi", 2, ep), Status::Ok);
    }

    #[test]
    fn scenario_9_set_severity_invalid_value_is_caller_responsibility() {
        // Validation of the raw wire integer happens in `protocol`, not
        // here; this test documents that a handler only ever receives
        // an already-validated Severity.
        use crate::protocol::validate_severity;
        assert!(validate_severity(0xbadf00du32 as i32).is_err());
    }

    #[test]
    fn scenario_10_oversized_body_is_caller_responsibility() {
        use crate::protocol::validate_msg_len;
        assert!(validate_msg_len(16383).is_err());
    }

    #[test]
    fn write_below_threshold_is_dropped_not_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        let ep = Endpoint(1);
        s.start_log("FileLogger1", ep);
        // default severity for FileLogger1 is info; trace is below it.
        assert_eq!(s.write_log("FileLogger1", Severity::Trace, b"x", 1, ep), Status::Ok);
    }

    #[test]
    fn write_requires_ownership() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        let owner = Endpoint(1);
        let intruder = Endpoint(2);
        s.start_log("FileLogger1", owner);
        assert_eq!(s.write_log("FileLogger1", Severity::Warn, b"x", 1, intruder), Status::PermissionDenied);
    }

    #[test]
    fn scenario_11_clear_while_open_then_after_close() {
        let conf = "logger ScratchLog1 {\n\
            destination = file\n\
            filename = /tmp/s1.log\n\
            format = %m\n\
            }\n\
            logger ScratchLog2 {\n\
            destination = file\n\
            filename = /tmp/s2.log\n\
            format = %m\n\
            }\n";
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, conf);
        let mut s = server(path);
        let ep = Endpoint(1);
        s.start_log("ScratchLog1", ep);
        s.start_log("ScratchLog2", ep);
        assert_eq!(s.clear_all(), Status::LoggerOpen);
        s.close_log("ScratchLog1", ep);
        s.close_log("ScratchLog2", ep);
        assert_eq!(s.clear_all(), Status::Ok);
    }

    #[test]
    fn clear_all_idempotent_when_all_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        assert_eq!(s.clear_all(), Status::Ok);
        assert_eq!(s.clear_all(), Status::Ok);
    }

    #[test]
    fn close_requires_ownership() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        s.start_log("StdoutLogger1", Endpoint(1));
        assert_eq!(s.close_log("StdoutLogger1", Endpoint(2)), Status::PermissionDenied);
    }

    #[test]
    fn start_close_start_allows_different_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, SAMPLE_CONF);
        let mut s = server(path);
        let a = Endpoint(1);
        let b = Endpoint(2);
        assert_eq!(s.start_log("StdoutLogger1", a), Status::Ok);
        assert_eq!(s.close_log("StdoutLogger1", a), Status::Ok);
        assert_eq!(s.start_log("StdoutLogger1", b), Status::Ok);
    }
}
