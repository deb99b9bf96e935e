use tether::config::{Config, ENABLE_KEEP_ALIVE};
use tether::http::keep_alive::{should_keep_alive, suggest_connection_header};

fn config(keep_alive: &str) -> Config {
    Config::default().with(ENABLE_KEEP_ALIVE, keep_alive)
}

#[test]
fn test_request_sequence() {
    let on = config("yes");
    let off = config("no");

    assert!(!should_keep_alive(&off, false, 200, "1.1", None));
    assert!(should_keep_alive(&on, false, 200, "1.1", None));
    assert!(!should_keep_alive(&on, true, 200, "1.1", None));
    assert!(!should_keep_alive(&on, false, 200, "1.0", None));
    assert!(!should_keep_alive(&on, false, 200, "1.1", Some("close")));
    assert!(should_keep_alive(&on, false, 200, "1.1", Some("keep-alive")));
    assert!(!should_keep_alive(&on, false, 401, "1.1", Some("keep-alive")));
    assert!(!should_keep_alive(&on, false, 500, "1.1", Some("keep-alive")));
    assert!(should_keep_alive(&on, false, 302, "1.1", Some("keep-alive")));
}

#[test]
fn test_keep_alive_header_upgrades_http10() {
    let on = config("yes");
    assert!(should_keep_alive(&on, false, 200, "1.0", Some("Keep-Alive")));
    assert!(!should_keep_alive(&on, false, 200, "1.1", Some(" CLOSE ")));
}

#[test]
fn test_precedence_over_every_combination() {
    for enabled in ["yes", "no", "YES", "off"] {
        let cfg = config(enabled);
        for must_close in [false, true] {
            for status in [200, 204, 302, 400, 404, 413, 500, 503] {
                for version in ["1.0", "1.1"] {
                    for header in [None, Some("close"), Some("keep-alive"), Some("upgrade")] {
                        let expected = enabled.eq_ignore_ascii_case("yes")
                            && !must_close
                            && status < 400
                            && match header {
                                Some("close") => false,
                                Some("keep-alive") => true,
                                _ => version == "1.1",
                            };
                        assert_eq!(
                            should_keep_alive(&cfg, must_close, status, version, header),
                            expected,
                            "enabled={enabled} must_close={must_close} status={status} \
                             version={version} header={header:?}"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_connection_header_suggestion() {
    let on = config("yes");
    assert_eq!(suggest_connection_header(&on, false, 0, "1.1", None), "close");
    assert_eq!(suggest_connection_header(&on, false, 200, "1.1", None), "keep-alive");
    assert_eq!(suggest_connection_header(&on, false, 404, "1.1", None), "close");
    assert_eq!(
        suggest_connection_header(&config("no"), false, 200, "1.1", None),
        "close"
    );
}
