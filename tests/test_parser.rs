use hijack_relay::http::body::RemainingBody;
use hijack_relay::http::parser::{MAX_HEAD_SIZE, ParseError, parse_http_request};
use hijack_relay::http::request::Method;

#[test]
fn test_parse_simple_get_request() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let (parsed, consumed, _) = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.path, "/");
    assert_eq!(parsed.version, "HTTP/1.1");
    assert_eq!(parsed.header("Host"), Some("example.com"));
    assert_eq!(consumed, req.len());
}

#[test]
fn test_parse_post_request_with_body() {
    let req = b"POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
    let (parsed, consumed, _) = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.path, "/api");
    assert_eq!(parsed.body, b"hello".to_vec());
    assert_eq!(consumed, req.len());
}

#[test]
fn test_parse_headers_keep_arrival_order() {
    let req = b"GET /path HTTP/1.1\r\nUser-Agent: test-client\r\nHost: example.com\r\nAccept: */*\r\n\r\n";
    let (parsed, _, _) = parse_http_request(req).unwrap();

    let names: Vec<&str> = parsed.headers.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(names, vec!["User-Agent", "Host", "Accept"]);
}

#[test]
fn test_parse_request_with_path_and_query_string() {
    let req = b"GET /search?q=rust HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let (parsed, _, _) = parse_http_request(req).unwrap();

    assert_eq!(parsed.path, "/search?q=rust");
}

#[test]
fn test_parse_incomplete_request_missing_blank_line() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n";

    assert!(matches!(parse_http_request(req), Err(ParseError::Incomplete)));
}

#[test]
fn test_parse_returns_head_before_body_arrives() {
    let req = b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello";
    let (parsed, consumed, remaining) = parse_http_request(req).unwrap();

    assert_eq!(parsed.body, b"hello".to_vec());
    assert_eq!(consumed, req.len());
    assert_eq!(remaining, RemainingBody::Length(5));
}

#[test]
fn test_parse_huge_content_length_does_not_overflow() {
    let req = b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 18446744073709551615\r\n\r\nabc";
    let (parsed, consumed, remaining) = parse_http_request(req).unwrap();

    assert_eq!(parsed.body, b"abc".to_vec());
    assert_eq!(consumed, req.len());
    assert_eq!(remaining, RemainingBody::Length(u64::MAX - 3));
}

#[test]
fn test_parse_content_length_beyond_u64_rejected() {
    let req = b"POST / HTTP/1.1\r\nContent-Length: 99999999999999999999999\r\n\r\n";

    assert!(matches!(
        parse_http_request(req),
        Err(ParseError::InvalidContentLength)
    ));
}

#[test]
fn test_parse_huge_chunk_size_does_not_overflow() {
    let req = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffed\r\nabc";
    let (parsed, consumed, remaining) = parse_http_request(req).unwrap();

    assert_eq!(parsed.body, b"ffffffffffffffed\r\nabc".to_vec());
    assert_eq!(consumed, req.len());
    assert!(matches!(remaining, RemainingBody::Chunked(_)));
}

#[test]
fn test_parse_invalid_chunk_size_rejected() {
    let req = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nxyz\r\n";

    assert!(matches!(parse_http_request(req), Err(ParseError::InvalidChunk)));
}

#[test]
fn test_parse_stops_at_request_boundary() {
    let req = b"POST /a HTTP/1.1\r\nContent-Length: 2\r\n\r\nokGET /b HTTP/1.1\r\n\r\n";
    let (parsed, consumed, remaining) = parse_http_request(req).unwrap();

    assert!(remaining.is_done());
    assert_eq!(parsed.body, b"ok".to_vec());
    assert_eq!(&req[consumed..], b"GET /b HTTP/1.1\r\n\r\n");
}

#[test]
fn test_parse_invalid_http_method() {
    let req = b"GE(T / HTTP/1.1\r\n\r\n";

    assert!(matches!(parse_http_request(req), Err(ParseError::InvalidMethod)));
}

#[test]
fn test_parse_extension_method() {
    let req = b"PROPFIND /dav HTTP/1.1\r\n\r\n";
    let (parsed, _, _) = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::Extension("PROPFIND".to_string()));
}

#[test]
fn test_parse_malformed_header() {
    let req = b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n";

    assert!(matches!(parse_http_request(req), Err(ParseError::InvalidHeader)));
}

#[test]
fn test_parse_rejects_space_before_colon() {
    let req = b"GET / HTTP/1.1\r\nHost : example.com\r\n\r\n";

    assert!(matches!(parse_http_request(req), Err(ParseError::InvalidHeader)));
}

#[test]
fn test_parse_rejects_bad_request_line() {
    for req in [
        &b"GET /\r\n\r\n"[..],
        b"GET / HTTP/1.1 extra\r\n\r\n",
        b"GET / FTP/1.0\r\n\r\n",
    ] {
        assert!(matches!(parse_http_request(req), Err(ParseError::InvalidRequest)));
    }
}

#[test]
fn test_parse_various_http_methods() {
    let methods = vec![
        ("GET", Method::GET),
        ("POST", Method::POST),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
        ("HEAD", Method::HEAD),
        ("OPTIONS", Method::OPTIONS),
        ("PATCH", Method::PATCH),
        ("CONNECT", Method::CONNECT),
        ("TRACE", Method::TRACE),
    ];

    for (method_str, expected_method) in methods {
        let req = format!("{} / HTTP/1.1\r\n\r\n", method_str);
        let (parsed, _, _) = parse_http_request(req.as_bytes()).unwrap();
        assert_eq!(parsed.method, expected_method);
    }
}

#[test]
fn test_parse_request_with_binary_body() {
    let req = b"POST /upload HTTP/1.1\r\nContent-Length: 4\r\n\r\n\x00\x01\x02\x03";
    let (parsed, _, _) = parse_http_request(req).unwrap();

    assert_eq!(parsed.body, vec![0, 1, 2, 3]);
}

#[test]
fn test_parse_invalid_content_length() {
    let req = b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n";

    assert!(matches!(
        parse_http_request(req),
        Err(ParseError::InvalidContentLength)
    ));
}

#[test]
fn test_parse_conflicting_content_lengths() {
    let req = b"POST / HTTP/1.1\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\nab";

    assert!(matches!(
        parse_http_request(req),
        Err(ParseError::InvalidContentLength)
    ));
}

#[test]
fn test_parse_chunked_body_kept_raw() {
    let body = b"3\r\nabc\r\n0\r\n\r\n";
    let mut req = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    req.extend_from_slice(body);

    let (parsed, consumed, remaining) = parse_http_request(&req).unwrap();

    assert!(parsed.is_chunked());
    assert!(remaining.is_done());
    assert_eq!(parsed.body, body.to_vec());
    assert_eq!(consumed, req.len());
}

#[test]
fn test_parse_chunked_with_content_length_rejected() {
    let req = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 3\r\n\r\n0\r\n\r\n";

    assert!(matches!(parse_http_request(req), Err(ParseError::InvalidRequest)));
}

#[test]
fn test_parse_head_too_large() {
    let mut req = b"GET / HTTP/1.1\r\nX-Big: ".to_vec();
    req.extend(std::iter::repeat_n(b'a', MAX_HEAD_SIZE + 1));

    assert!(matches!(parse_http_request(&req), Err(ParseError::HeadTooLarge)));
}

#[test]
fn test_parse_serialize_round_trip_is_identical() {
    let raw = b"DELETE /items/7 HTTP/1.1\r\nHost: example.com\r\nX-Request-Id: abc\r\nContent-Length: 3\r\n\r\nxyz";
    let (parsed, _, _) = parse_http_request(raw).unwrap();

    assert_eq!(parsed.to_bytes(), raw.to_vec());
}
