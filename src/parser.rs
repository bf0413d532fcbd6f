//! Hand-rolled, byte-at-a-time config file parser.
//!
//! Grammar (informal, see SPEC_FULL.md §4.B):
//! ```text
//! config      := ( logger_block )*
//! logger_block:= "logger" NAME "{" NEWLINE ( option NEWLINE )* "}"
//! option      := OPTION_NAME ( WS | "=" ) WS? VALUE
//! ```
//!
//! The parser is modeled as a state machine fed one character at a time,
//! exposed as a lazy iterator so tests can drive it with synthetic byte
//! sequences without touching the filesystem (SPEC_FULL.md §9).

use crate::reader::{BufReader, NextChar};
use crate::registry::{Destination, LoggerDef, Severity, MAX_FILENAME_LEN, MAX_FORMAT_LEN, MAX_NAME_LEN};
use std::io;

const MAX_VALUE_LEN: usize = 2048;

/// A parse error with 1-based line and column of the offending byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub line: u32,
    pub col: u32,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for ParseError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    LoggerKeyword,
    LoggerName,
    OpenBrace,
    OpenBraceNewline,
    OptionName,
    OptionEquals,
    OptionValue,
}

/// Accumulates a partially-built logger definition plus the flags needed
/// to validate it cross-field once `}` is reached.
#[derive(Default)]
struct PartialLogger {
    name: String,
    destination: Option<Destination>,
    default_severity: Option<Severity>,
    filename: Option<String>,
    append: Option<bool>,
    format: Option<String>,
    did_set_destination: bool,
    did_set_filename: bool,
    did_set_append: bool,
    did_set_format: bool,
}

/// Byte-at-a-time parser state, independent of any particular input
/// source. [`ConfigParser`] drives this against a [`BufReader`].
struct Machine {
    state: State,
    line: u32,
    col: u32,
    consume_offset: usize,
    curr_value: String,
    option_name: String,
    current: PartialLogger,
}

enum Step {
    Ok,
    GotLogger(LoggerDef),
    Error(ParseError),
}

impl Machine {
    fn new() -> Self {
        Machine {
            state: State::LoggerKeyword,
            line: 1,
            col: 1,
            consume_offset: 0,
            curr_value: String::new(),
            option_name: String::new(),
            current: PartialLogger::default(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError { line: self.line, col: self.col, message: message.into() }
    }

    fn is_whitespace_invariant(&self) -> bool {
        match self.state {
            State::LoggerName if !self.curr_value.is_empty() => false,
            State::LoggerKeyword if self.consume_offset > 0 => false,
            State::OptionName if !self.curr_value.is_empty() => false,
            State::OptionValue if !self.curr_value.is_empty() => false,
            _ => true,
        }
    }

    fn is_newline_invariant(&self) -> bool {
        match self.state {
            State::OpenBrace if self.consume_offset == 0 => true,
            State::LoggerKeyword if self.consume_offset == 0 => true,
            State::OptionName if self.curr_value.is_empty() => true,
            _ => false,
        }
    }

    fn consume_literal(&mut self, literal: &str, ch: char, next: State) -> Result<(), String> {
        let lit_bytes = literal.as_bytes();
        if lit_bytes[self.consume_offset] == ch as u8 {
            self.consume_offset += 1;
            if self.consume_offset >= literal.len() {
                self.state = next;
                self.consume_offset = 0;
                self.curr_value.clear();
            }
            Ok(())
        } else {
            Err(format!(
                "unexpected character '{}' while consuming literal '{}'",
                translate_char(ch),
                literal
            ))
        }
    }

    fn advance(&mut self, ch: char) -> Step {
        if ch == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }

        if (is_white(ch) && self.is_whitespace_invariant())
            || (ch == '\n' && self.is_newline_invariant())
        {
            return Step::Ok;
        }

        match self.state {
            State::LoggerKeyword => {
                self.current = PartialLogger::default();
                match self.consume_literal("logger", ch, State::LoggerName) {
                    Ok(()) => Step::Ok,
                    Err(msg) => Step::Error(self.error(msg)),
                }
            }
            State::OpenBrace => match self.consume_literal("{", ch, State::OpenBraceNewline) {
                Ok(()) => Step::Ok,
                Err(msg) => Step::Error(self.error(msg)),
            },
            State::OpenBraceNewline => match self.consume_literal("\n", ch, State::OptionName) {
                Ok(()) => Step::Ok,
                Err(msg) => Step::Error(self.error(msg)),
            },
            State::OptionEquals => match self.consume_literal("=", ch, State::OptionValue) {
                Ok(()) => Step::Ok,
                Err(msg) => Step::Error(self.error(msg)),
            },
            State::LoggerName => {
                if is_allowed_in_logger_name(ch) && self.curr_value.len() < MAX_NAME_LEN {
                    self.curr_value.push(ch);
                    Step::Ok
                } else if is_white(ch) || ch == '\n' {
                    if self.curr_value.is_empty() {
                        return Step::Error(self.error("logger name must not be empty"));
                    }
                    self.current.name = std::mem::take(&mut self.curr_value);
                    self.state = State::OpenBrace;
                    self.consume_offset = 0;
                    Step::Ok
                } else {
                    Step::Error(self.error(format!(
                        "unexpected character '{}' in logger name",
                        translate_char(ch)
                    )))
                }
            }
            State::OptionName => {
                if is_allowed_in_config_option_name(ch) && self.curr_value.len() < MAX_VALUE_LEN - 1 {
                    self.curr_value.push(ch);
                    Step::Ok
                } else if ch == '}' {
                    self.state = State::LoggerKeyword;
                    self.consume_offset = 0;
                    match self.finish_logger() {
                        Ok(def) => Step::GotLogger(def),
                        Err(msg) => Step::Error(self.error(msg)),
                    }
                } else if (ch == '=' || is_white(ch)) && !self.curr_value.is_empty() {
                    self.state = if ch == '=' { State::OptionValue } else { State::OptionEquals };
                    self.option_name = std::mem::take(&mut self.curr_value);
                    self.consume_offset = 0;
                    Step::Ok
                } else {
                    Step::Error(self.error(format!(
                        "unexpected character '{}' in option name",
                        translate_char(ch)
                    )))
                }
            }
            State::OptionValue => {
                if ch == '\n' {
                    self.state = State::OptionName;
                    let value = std::mem::take(&mut self.curr_value);
                    match self.set_option(&value) {
                        Ok(()) => {
                            self.consume_offset = 0;
                            Step::Ok
                        }
                        Err(msg) => Step::Error(self.error(msg)),
                    }
                } else if self.curr_value.len() < MAX_VALUE_LEN - 1 {
                    self.curr_value.push(ch);
                    Step::Ok
                } else {
                    Step::Error(self.error(format!(
                        "unexpected character '{}' in option value",
                        translate_char(ch)
                    )))
                }
            }
        }
    }

    fn set_option(&mut self, raw_value: &str) -> Result<(), String> {
        let option_name = self.option_name.trim();
        let option_value = raw_value.trim();

        match option_name {
            "destination" => {
                self.current.did_set_destination = true;
                let dest = Destination::from_str(option_value).ok_or_else(|| {
                    format!(
                        "invalid logger destination '{}' (expected one of 'file', 'stdout', 'stderr')",
                        option_value
                    )
                })?;
                self.current.destination = Some(dest);
            }
            "severity" => {
                let sev = Severity::from_str(option_value).ok_or_else(|| {
                    format!(
                        "invalid logger severity '{}' (expected one of 'trace', 'debug', 'info', 'warn')",
                        option_value
                    )
                })?;
                self.current.default_severity = Some(sev);
            }
            "format" => {
                self.current.did_set_format = true;
                if option_value.len() > MAX_FORMAT_LEN {
                    return Err(format!(
                        "logger format string has length {}, longer than maximum allowed ({})",
                        option_value.len(),
                        MAX_FORMAT_LEN
                    ));
                }
                self.current.format = Some(option_value.to_string());
            }
            "filename" => {
                self.current.did_set_filename = true;
                if option_value.len() > MAX_FILENAME_LEN {
                    return Err(format!(
                        "logger filename has length {}, longer than maximum allowed ({})",
                        option_value.len(),
                        MAX_FILENAME_LEN
                    ));
                }
                self.current.filename = Some(option_value.to_string());
            }
            "append" => {
                self.current.did_set_append = true;
                let append = match option_value {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(format!(
                            "invalid append value '{}' (expected 'true' or 'false')",
                            option_value
                        ))
                    }
                };
                self.current.append = Some(append);
            }
            other => {
                return Err(format!(
                    "invalid option name '{}' (expected one of 'destination', 'filename', \
                     'severity', 'format', 'append')",
                    other
                ))
            }
        }
        Ok(())
    }

    /// Validates the accumulated logger and converts it into a
    /// [`LoggerDef`], mirroring `is_logger_valid` in the original parser.
    fn finish_logger(&mut self) -> Result<LoggerDef, String> {
        let p = std::mem::take(&mut self.current);

        if !p.did_set_format {
            return Err(format!("logger '{}' has no format option, but it is required", p.name));
        }
        if !p.did_set_destination {
            return Err(format!("logger '{}' has no destination option, but it is required", p.name));
        }
        let destination = p.destination.unwrap();

        if p.did_set_filename && destination != Destination::File {
            return Err(format!(
                "logger '{}' has a filename option, but its destination is not a file",
                p.name
            ));
        }
        if p.did_set_append && destination != Destination::File {
            return Err(format!(
                "logger '{}' has an append option, but its destination is not a file",
                p.name
            ));
        }
        if destination == Destination::File && !p.did_set_filename {
            return Err(format!(
                "logger '{}' has no filename option, but its destination is a file",
                p.name
            ));
        }

        Ok(LoggerDef {
            name: p.name,
            destination,
            default_severity: p.default_severity.unwrap_or(Severity::Info),
            filename: p.filename,
            // Resolved open question (SPEC_FULL.md §12.1): defaults to
            // false, matching the original's zero-initialized struct.
            append: p.append.unwrap_or(false),
            format: p.format.unwrap_or_default(),
        })
    }
}

fn is_white(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

fn is_allowed_in_logger_name(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn is_allowed_in_config_option_name(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit()
}

fn translate_char(ch: char) -> String {
    match ch {
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\r' => "\\r".to_string(),
        other => other.to_string(),
    }
}

/// Drives the [`Machine`] over any byte source, yielding logger
/// definitions lazily. Once an error is yielded or the input is
/// exhausted, the iterator is done; the parser does not restart.
pub struct ConfigParser<R> {
    reader: BufReader<R>,
    machine: Machine,
    done: bool,
}

impl<R: io::Read> ConfigParser<R> {
    pub fn new(inner: R) -> io::Result<Self> {
        Ok(ConfigParser { reader: BufReader::new(inner)?, machine: Machine::new(), done: false })
    }
}

impl<R: io::Read> Iterator for ConfigParser<R> {
    type Item = Result<LoggerDef, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.reader.next_char() {
                NextChar::Eof => {
                    self.done = true;
                    return None;
                }
                NextChar::Err => {
                    self.done = true;
                    return Some(Err(ParseError {
                        line: self.machine.line,
                        col: self.machine.col,
                        message: "io error while reading config file".to_string(),
                    }));
                }
                NextChar::Byte(b) => match self.machine.advance(b as char) {
                    Step::Ok => continue,
                    Step::GotLogger(def) => return Some(Ok(def)),
                    Step::Error(err) => {
                        self.done = true;
                        return Some(Err(err));
                    }
                },
            }
        }
    }
}

/// Parses a complete config source, collecting all loggers or returning
/// the first parse error encountered (partial loggers are discarded, per
/// SPEC_FULL.md §4.B: "the caller aborts the whole parse").
pub fn parse_all<R: io::Read>(inner: R) -> Result<Vec<LoggerDef>, ParseError> {
    let parser = ConfigParser::new(inner).map_err(|e| ParseError {
        line: 1,
        col: 1,
        message: format!("failed to open config source: {}", e),
    })?;
    let mut out = Vec::new();
    for item in parser {
        out.push(item?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(src: &str) -> Result<Vec<LoggerDef>, ParseError> {
        parse_all(Cursor::new(src.as_bytes().to_vec()))
    }

    #[test]
    fn parses_single_file_logger() {
        let src = "logger FileLogger1 {\n\
                    destination = file\n\
                    filename = /var/log/file1.log\n\
                    severity = info\n\
                    format = [%t] %l %n: %m\n\
                    append = true\n\
                    }\n";
        let defs = parse(src).unwrap();
        assert_eq!(defs.len(), 1);
        let d = &defs[0];
        assert_eq!(d.name, "FileLogger1");
        assert_eq!(d.destination, Destination::File);
        assert_eq!(d.default_severity, Severity::Info);
        assert_eq!(d.filename.as_deref(), Some("/var/log/file1.log"));
        assert!(d.append);
        assert_eq!(d.format, "[%t] %l %n: %m");
    }

    #[test]
    fn parses_multiple_loggers_preserving_order() {
        let src = "logger A {\n\
                    destination = stdout\n\
                    format = %m\n\
                    }\n\
                    logger B {\n\
                    destination = stderr\n\
                    format = %m\n\
                    }\n";
        let defs = parse(src).unwrap();
        assert_eq!(defs.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn append_defaults_to_false() {
        let src = "logger A {\n\
                    destination = file\n\
                    filename = /tmp/a.log\n\
                    format = %m\n\
                    }\n";
        let defs = parse(src).unwrap();
        assert!(!defs[0].append);
    }

    #[test]
    fn missing_format_is_error() {
        let src = "logger A {\n\
                    destination = stdout\n\
                    }\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn missing_destination_is_error() {
        let src = "logger A {\n\
                    format = %m\n\
                    }\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn filename_without_file_destination_is_error() {
        let src = "logger A {\n\
                    destination = stdout\n\
                    filename = /tmp/a.log\n\
                    format = %m\n\
                    }\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn file_destination_without_filename_is_error() {
        let src = "logger A {\n\
                    destination = file\n\
                    format = %m\n\
                    }\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn unknown_option_is_error() {
        let src = "logger A {\n\
                    bogus = 1\n\
                    }\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn error_reports_line_and_column() {
        let src = "logger A {\n\
                    destination = nonsense\n\
                    format = %m\n\
                    }\n";
        let err = parse(src).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn empty_config_yields_no_loggers() {
        assert_eq!(parse("").unwrap(), Vec::new());
    }

    #[test]
    fn blank_lines_between_blocks_are_allowed() {
        let src = "\n\nlogger A {\n\
                    destination = stdout\n\
                    format = %m\n\
                    }\n\n";
        let defs = parse(src).unwrap();
        assert_eq!(defs.len(), 1);
    }
}
