use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use tether::logpath::{LogContext, fingerprint, render_log_path, scrub};

const LONG_URI: &str = "http://example.com/Oops.I.did.it.again....yeah....yeah....yeah....errr....?&_&_&_&_&_ohhhhh....you shouldn't have.... Now let's see whether this bugger does da right thang for long URLs when we wanna have them as part of the logpath..........";
const NO_QUERY_URI: &str = "http://example.com/Oops.I.did.it.again....yeah....yeah....yeah....errr....ohhhhh....you shouldn't have.... Now let's see whether this bugger does da right thang for long URLs when we wanna have them as part of the logpath..........";
const QUERY_URI: &str =
    "http://example.com/sample/page/tree?with-query=y&oh%20baby,%20oops!%20I%20did%20it%20again!";

fn when() -> DateTime<Utc> {
    DateTime::from_timestamp(1_234_567_890, 0).unwrap()
}

fn render(template: &str, uri: Option<&str>, capacity: usize) -> String {
    let ctx = LogContext {
        uri,
        ..Default::default()
    };
    render_log_path(template, &ctx, &when(), capacity)
}

#[test]
fn test_tiny_destination_truncates() {
    assert_eq!(render("%[U].long-blubber.log", None, 13), "_.long-blubb");
    assert_eq!(render("%[U].long-blubber.log", Some(QUERY_URI), 13), "http.example");
}

#[test]
fn test_missing_value_is_underscore() {
    assert_eq!(render("%[U].long-blubber.log", None, 512), "_.long-blubber.log");
}

#[test]
fn test_uri_key_drops_query() {
    assert_eq!(
        render("%[U].long-blubber.log", Some(QUERY_URI), 512),
        "http.example.com.sample.page.tree.long-blubber.log"
    );
}

#[test]
fn test_query_key_renders_query_only() {
    assert_eq!(
        render("%[Q]", Some(QUERY_URI), 512),
        "with-query_y_oh_20baby_20oops_20I_20did_20it_20again"
    );
    assert_eq!(
        render("%Y/%[Q]/%d/%m/blubber.log", Some(NO_QUERY_URI), 512),
        "2009/_/13/02/blubber.log"
    );
    assert_eq!(render("%[Q]", Some("/a?"), 64), "_");
}

#[test]
fn test_calendar_fields_surround_request_fields() {
    assert_eq!(
        render("%Y/%[U]/%d/%m/blubber.log", Some("/a/b?c"), 512),
        "2009/.a.b/13/02/blubber.log"
    );
}

#[test]
fn test_small_cap_keeps_fingerprint_tail() {
    let query = LONG_URI.split_once('?').unwrap().1;
    let print = fingerprint(query);
    assert_eq!(
        render("%Y/%[4Q]/%d/%m/blubber.log", Some(LONG_URI), 512),
        format!("2009/{}/13/02/blubber.log", &print[4..])
    );
}

#[test]
fn test_cap_cuts_and_appends_fingerprint() {
    let print = fingerprint(LONG_URI);
    assert_eq!(
        render("%Y/%[20U]/%d/%m/blubber.log", Some(LONG_URI), 512),
        format!("2009/http.example{print}/13/02/blubber.log")
    );

    let query = LONG_URI.split_once('?').unwrap().1;
    assert_eq!(
        render("%Y/%[20Q]/%d/%m/blubber.log", Some(LONG_URI), 512),
        format!("2009/_ohhhhh.you_{}/13/02/blubber.log", fingerprint(query))
    );
}

#[test]
fn test_fingerprint_covers_query_for_uri_key() {
    assert_ne!(
        render("%[20U]", Some(LONG_URI), 512),
        render("%[20U]", Some(NO_QUERY_URI), 512)
    );
}

#[test]
fn test_cap_equal_to_length_does_not_hash() {
    assert_eq!(
        render("%Y/%[56U]/%d/%m/blubber.log", Some(LONG_URI), 512),
        "2009/http.example.com.Oops.I.did.it.again.yeah.yeah.yeah.errr/13/02/blubber.log"
    );
    assert_eq!(
        render("%Y/%[55U]/%d/%m/blubber.log", Some(LONG_URI), 512),
        format!(
            "2009/http.example.com.Oops.I.did.it.again.yeah.yeah.{}/13/02/blubber.log",
            fingerprint(LONG_URI)
        )
    );
}

#[test]
fn test_uncapped_value_is_never_hashed() {
    let query = LONG_URI.split_once('?').unwrap().1;
    assert_eq!(render("%[Q]", Some(LONG_URI), 4096), scrub(query));
}

#[test]
fn test_invalid_caps_are_ignored() {
    let full = render("%[U]", Some(LONG_URI), 4096);
    assert_eq!(render("%[0U]", Some(LONG_URI), 4096), full);
    assert_eq!(render("%[-5U]", Some(LONG_URI), 4096), full);
}

#[test]
fn test_unknown_key_is_flagged() {
    assert_eq!(render("a%[X]b", None, 64), "a![X]b");
    assert_eq!(render("%[12Z]", None, 64), "![Z]");
}

#[test]
fn test_addresses() {
    let remote: SocketAddr = "10.0.0.1:5555".parse().unwrap();
    let local: SocketAddr = "192.168.1.2:80".parse().unwrap();
    let ctx = LogContext {
        uri: None,
        remote: Some(remote),
        local: Some(local),
    };
    assert_eq!(
        render_log_path("%[C]-%[P]_%[s]-%[p]", &ctx, &when(), 64),
        "10.0.0.1-5555_192.168.1.2-80"
    );
    assert_eq!(render("%[C]", None, 64), "_");
}

#[test]
fn test_fingerprint_is_stable_hex() {
    let a = fingerprint("abc");
    assert_eq!(a.len(), 8);
    assert!(a.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    assert_eq!(a, fingerprint("abc"));
    assert_ne!(a, fingerprint("abd"));
}
