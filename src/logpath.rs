//! Log file path templates.
//!
//! A template mixes literal text with two kinds of directives:
//!
//! - `%<letter>`: a calendar field (`%Y`, `%m`, `%d`, ...) rendered from the
//!   supplied timestamp; `%%` is a literal `%`.
//! - `%[<size><key>]`: a value taken from the request, scrubbed so it is safe
//!   inside a file name. `key` is one of
//!   - `U` the request URI with its query string removed,
//!   - `Q` the query string alone, without the `?`,
//!   - `C` / `P` the remote address / port,
//!   - `s` / `p` the local address / port.
//!
//! The optional decimal `size` caps the rendered value. A value longer than
//! the cap is cut and ends in an 8 hex digit fingerprint, so two long values
//! sharing a prefix still render differently. For `U` the fingerprint covers
//! the whole target, query included. Caps of 8 or
//! less keep only the tail of the fingerprint; a zero, negative or
//! unreadable cap is ignored.
//!
//! An unknown key renders as `![key]` and a missing value (no URI, or no
//! query for `Q`) as `_`. Rendering
//! always succeeds.

use std::fmt::{Display, Write as _};
use std::net::SocketAddr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};

/// Hex digits in a fingerprint.
pub const FINGERPRINT_LEN: usize = 8;

/// Request data a template can refer to.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogContext<'a> {
    /// Request target as received, query string included.
    /// `U` and `Q` split it at the first `?`.
    pub uri: Option<&'a str>,
    pub remote: Option<SocketAddr>,
    pub local: Option<SocketAddr>,
}

/// Renders `template` into a path of at most `capacity - 1` bytes.
///
/// `capacity` counts a terminator slot the way a fixed C buffer would, so a
/// 13 byte destination yields at most 12 bytes of path.
pub fn render_log_path<Tz>(
    template: &str,
    ctx: &LogContext<'_>,
    when: &DateTime<Tz>,
    capacity: usize,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];

        if let Some(inner) = rest.strip_prefix('[') {
            match inner.find(']') {
                Some(end) => {
                    render_request_field(&inner[..end], ctx, &mut out);
                    rest = &inner[end + 1..];
                }
                None => {
                    out.push_str("%[");
                    rest = inner;
                }
            }
            continue;
        }

        match rest.chars().next() {
            Some(c) => {
                render_calendar_field(c, when, &mut out);
                rest = &rest[c.len_utf8()..];
            }
            None => out.push('%'),
        }
    }
    out.push_str(rest);

    truncate_to(&mut out, capacity.saturating_sub(1));
    out
}

fn render_calendar_field<Tz>(c: char, when: &DateTime<Tz>, out: &mut String)
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let pattern = format!("%{c}");
    let valid = c.is_ascii_alphabetic() || c == '%';
    if !valid || StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
        out.push_str(&pattern);
        return;
    }

    let mark = out.len();
    if write!(out, "{}", when.format(&pattern)).is_err() {
        out.truncate(mark);
        out.push_str(&pattern);
    }
}

/// Renders the inside of a `%[...]` directive.
fn render_request_field(directive: &str, ctx: &LogContext<'_>, out: &mut String) {
    let digits_end = directive
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map_or(directive.len(), |(i, _)| i);
    let (size, key) = directive.split_at(digits_end);

    let target = ctx.uri.map(|u| u.split_once('?').map_or((u, None), |(p, q)| (p, Some(q))));

    // (value to print, value to fingerprint)
    let raw: Option<(String, &str)> = match key {
        "U" => ctx.uri.zip(target).map(|(full, (path, _))| (path.to_string(), full)),
        "Q" => target.and_then(|(_, query)| query).map(|q| (q.to_string(), q)),
        "C" => ctx.remote.map(|a| (a.ip().to_string(), "")),
        "P" => ctx.remote.map(|a| (a.port().to_string(), "")),
        "s" => ctx.local.map(|a| (a.ip().to_string(), "")),
        "p" => ctx.local.map(|a| (a.port().to_string(), "")),
        _ => {
            out.push_str("![");
            out.push_str(key);
            out.push(']');
            return;
        }
    };

    let Some((raw, source)) = raw else {
        out.push('_');
        return;
    };
    let source = if source.is_empty() { raw.as_str() } else { source };

    let cap = size.parse::<i64>().ok().filter(|&n| n > 0);
    let scrubbed = scrub(&raw);
    if scrubbed.is_empty() {
        out.push('_');
        return;
    }

    match cap.and_then(|n| usize::try_from(n).ok()) {
        Some(cap) if scrubbed.len() > cap => {
            let print = fingerprint(source);
            if cap <= FINGERPRINT_LEN {
                out.push_str(&print[FINGERPRINT_LEN - cap..]);
            } else {
                out.push_str(&scrubbed[..cap - FINGERPRINT_LEN]);
                out.push_str(&print);
            }
        }
        _ => out.push_str(&scrubbed),
    }
}

/// Maps a value onto file-name-safe ASCII.
///
/// Letters, digits and `-` pass through. `.`, `/`, `\` and `:` become `.`;
/// everything else becomes `_`. Runs of `.` or `_` collapse to one, which
/// also rules out `..` in the output, and a trailing `.` or `_` is dropped.
pub fn scrub(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let mapped = match c {
            c if c.is_ascii_alphanumeric() || c == '-' => c,
            '.' | '/' | '\\' | ':' => '.',
            _ => '_',
        };
        if matches!(mapped, '.' | '_') && out.ends_with(mapped) {
            continue;
        }
        out.push(mapped);
    }
    let kept = out.trim_end_matches(['.', '_']).len();
    out.truncate(kept);
    out
}

/// 8 lowercase hex digits identifying `raw`.
pub fn fingerprint(raw: &str) -> String {
    format!("{:08x}", crc32fast::hash(raw.as_bytes()))
}

fn truncate_to(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_234_567_890, 0).unwrap()
    }

    #[test]
    fn scrub_collapses_runs() {
        assert_eq!(
            scrub("http://example.com/a....b"),
            "http.example.com.a.b"
        );
        assert_eq!(scrub("&_&_x y"), "_x_y");
        assert_eq!(scrub("tree...."), "tree");
        assert_eq!(scrub("again!"), "again");
    }

    #[test]
    fn calendar_fields() {
        let ctx = LogContext::default();
        let path = render_log_path("%Y/%m/%d/%%.log", &ctx, &epoch(), 256);
        assert_eq!(path, "2009/02/13/%.log");
    }

    #[test]
    fn unknown_calendar_field_is_literal() {
        let ctx = LogContext::default();
        assert_eq!(render_log_path("a%!b", &ctx, &epoch(), 256), "a%!b");
        assert_eq!(render_log_path("a%", &ctx, &epoch(), 256), "a%");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let ctx = LogContext::default();
        assert_eq!(render_log_path("aé", &ctx, &epoch(), 3), "a");
    }

    #[test]
    fn unterminated_bracket_is_literal() {
        let ctx = LogContext::default();
        assert_eq!(render_log_path("x%[U", &ctx, &epoch(), 256), "x%[U");
    }
}
