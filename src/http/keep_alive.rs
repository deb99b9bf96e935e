//! Keep-alive decision for a finished transaction.

use crate::config::Config;

/// Decides whether the connection may carry another transaction.
///
/// Rules are checked in order and the first that applies decides:
///
/// 1. keep-alive disabled in the configuration: close;
/// 2. the connection was flagged must-close: close;
/// 3. a 4xx/5xx status: close, whatever the headers say;
/// 4. `Connection: close` closes, `Connection: keep-alive` keeps;
/// 5. otherwise HTTP/1.1 keeps and anything else closes.
pub fn should_keep_alive(
    config: &Config,
    must_close: bool,
    status_code: u16,
    http_version: &str,
    connection_header: Option<&str>,
) -> bool {
    if !config.enable_keep_alive() {
        return false;
    }
    if must_close {
        return false;
    }
    if (400..600).contains(&status_code) {
        return false;
    }

    match connection_header.map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("close") => return false,
        Some(v) if v.eq_ignore_ascii_case("keep-alive") => return true,
        _ => {}
    }

    http_version == "1.1"
}

/// Value to put in an outgoing `Connection` header.
///
/// While the status code is still unknown (0) this plays safe and says
/// `close`.
pub fn suggest_connection_header(
    config: &Config,
    must_close: bool,
    status_code: u16,
    http_version: &str,
    connection_header: Option<&str>,
) -> &'static str {
    if status_code == 0 {
        return "close";
    }
    if should_keep_alive(config, must_close, status_code, http_version, connection_header) {
        "keep-alive"
    } else {
        "close"
    }
}
