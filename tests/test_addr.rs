use std::net::Ipv4Addr;

use tether::Error;
use tether::net::{parse_endpoint_list, parse_endpoint_token, parse_ipv4_literal};

#[test]
fn test_plain_port_binds_any_address() {
    let ep = parse_endpoint_token("8080").unwrap();
    assert_eq!(ep.port(), 8080);
    assert!(ep.is_any_address());
    assert!(!ep.tls);
}

#[test]
fn test_padded_tokens_from_a_list() {
    let ep = parse_endpoint_token("  20.21.22.23:280s,  ").unwrap();
    assert_eq!(*ep.addr.ip(), Ipv4Addr::new(20, 21, 22, 23));
    assert_eq!(ep.port(), 280);
    assert!(ep.tls);
    assert_eq!(ep.port_network_order(), [0x01, 0x18]);

    let ep = parse_endpoint_token("[10.11.12.13]:180     ,    ").unwrap();
    assert_eq!(*ep.addr.ip(), Ipv4Addr::new(10, 11, 12, 13));
    assert_eq!(ep.port(), 180);
    assert!(!ep.tls);
}

#[test]
fn test_rejected_tokens() {
    for bad in [":80", "host:80", "1.2.3:80", "80x", "", "1.2.3.4:", "70000", "1.2.3.4:-1"] {
        let err = parse_endpoint_token(bad).unwrap_err();
        assert!(matches!(err, Error::AddressParse { .. }), "token {bad:?}");
    }
}

#[test]
fn test_ipv4_literal() {
    assert_eq!(
        parse_ipv4_literal("127.0.0.1").unwrap(),
        Ipv4Addr::LOCALHOST
    );
    assert!(parse_ipv4_literal("256.0.0.1").is_err());
    assert!(parse_ipv4_literal("localhost").is_err());
}

#[test]
fn test_endpoint_list() {
    let eps = parse_endpoint_list("80, 443s,127.0.0.1:8080").unwrap();
    assert_eq!(eps.len(), 3);
    assert_eq!(eps[0].port(), 80);
    assert!(eps[1].tls);
    assert_eq!(*eps[2].addr.ip(), Ipv4Addr::LOCALHOST);

    assert!(parse_endpoint_list("").is_err());
    assert!(parse_endpoint_list(" , ").is_err());
    assert!(parse_endpoint_list("80,bogus").is_err());
}
