//! Format template rendering: expands `%`-placeholders into a bounded
//! output buffer. Truncation is not an error (SPEC_FULL.md §4.D).

use chrono::{DateTime, Utc};

/// Everything the renderer needs besides the template itself.
pub struct RenderContext<'a> {
    pub severity: &'a str,
    pub timestamp: Option<DateTime<Utc>>,
    pub process_name: Option<&'a str>,
    pub message: &'a [u8],
}

/// Renders `format` against `ctx` into `out`, stopping (without error) once
/// `out` reaches `max_len` bytes. Returns the number of bytes written.
///
/// Placeholders: `%l` severity name, `%t` timestamp (`unknown-time` on
/// absence), `%n` process name (`unknown-pid` on absence), `%m` message
/// body verbatim, `%%` literal percent, `%X` (any other `X`) passed
/// through as the two literal characters `%X`. A trailing newline is
/// always appended if it fits.
pub fn render(format: &str, ctx: &RenderContext, out: &mut Vec<u8>, max_len: usize) -> usize {
    let start_len = out.len();
    let mut chars = format.chars().peekable();

    macro_rules! put_byte {
        ($b:expr) => {
            if out.len() - start_len < max_len {
                out.push($b);
            } else {
                return out.len() - start_len;
            }
        };
    }
    macro_rules! put_str {
        ($s:expr) => {
            for b in $s.as_bytes() {
                put_byte!(*b);
            }
        };
    }

    while let Some(ch) = chars.next() {
        if ch == '%' {
            match chars.next() {
                None => break,
                Some('l') => put_str!(ctx.severity),
                Some('t') => match ctx.timestamp {
                    Some(ts) => put_str!(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
                    None => put_str!("unknown-time"),
                },
                Some('n') => put_str!(ctx.process_name.unwrap_or("unknown-pid")),
                Some('m') => {
                    for b in ctx.message {
                        put_byte!(*b);
                    }
                }
                Some('%') => put_byte!(b'%'),
                Some(other) => {
                    put_byte!(b'%');
                    let mut buf = [0u8; 4];
                    for b in other.encode_utf8(&mut buf).as_bytes() {
                        put_byte!(*b);
                    }
                }
            }
        } else {
            let mut buf = [0u8; 4];
            for b in ch.encode_utf8(&mut buf).as_bytes() {
                put_byte!(*b);
            }
        }
    }
    put_byte!(b'\n');
    out.len() - start_len
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx<'a>(message: &'a [u8]) -> RenderContext<'a> {
        RenderContext {
            severity: "info",
            timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            process_name: Some("init"),
            message,
        }
    }

    #[test]
    fn expands_all_placeholders() {
        let mut out = Vec::new();
        let n = render("[%t] %l %n: %m", &ctx(b"hello"), &mut out, 4096);
        let s = String::from_utf8(out).unwrap();
        assert_eq!(s, "[2024-01-02 03:04:05] info init: hello\n");
        assert_eq!(n, s.len());
    }

    #[test]
    fn literal_percent_and_unknown_escape() {
        let mut out = Vec::new();
        render("100%% done %q", &ctx(b""), &mut out, 4096);
        assert_eq!(String::from_utf8(out).unwrap(), "100% done %q\n");
    }

    #[test]
    fn missing_timestamp_and_procname_fallbacks() {
        let mut out = Vec::new();
        let c = RenderContext { severity: "warn", timestamp: None, process_name: None, message: b"x" };
        render("%t %n %m", &c, &mut out, 4096);
        assert_eq!(String::from_utf8(out).unwrap(), "unknown-time unknown-pid x\n");
    }

    #[test]
    fn truncates_without_error_when_buffer_full() {
        let mut out = Vec::new();
        let n = render("%m", &ctx(b"0123456789"), &mut out, 5);
        assert_eq!(n, 5);
        assert_eq!(out, b"01234");
    }

    #[test]
    fn message_is_copied_verbatim_including_embedded_nul() {
        let mut out = Vec::new();
        let msg = b"a\x00b";
        render("%m", &ctx(msg), &mut out, 4096);
        assert_eq!(&out[..msg.len()], msg);
    }
}
