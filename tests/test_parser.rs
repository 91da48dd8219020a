mod common;

use common::ChunkedReader;
use rawhttp::http::parser::{ParseError, RequestParser, RequestReader, RequestState, read_request};
use rawhttp::http::request::{Request, RequestLine};

const GET_REQUEST: &[u8] =
    b"GET / HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n";

const POST_REQUEST: &[u8] =
    b"POST /submit HTTP/1.1\r\nHost: localhost:42069\r\nContent-Length: 13\r\n\r\nhello world!\n";

async fn read_in_chunks(data: &[u8], chunk_size: usize) -> Result<Request, ParseError> {
    let mut reader = ChunkedReader::new(data, chunk_size);
    RequestReader::new(8, 1024).read_request(&mut reader).await
}

#[tokio::test]
async fn test_concrete_get_scenario() {
    let request = read_in_chunks(b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n", 3).await.unwrap();

    assert_eq!(
        request.line,
        RequestLine {
            method: "GET".to_string(),
            target: "/a".to_string(),
            version: "1.1".to_string(),
        }
    );
    assert_eq!(request.headers.iter().collect::<Vec<_>>(), vec![("host", "x")]);
    assert!(request.body.is_empty());
}

#[tokio::test]
async fn test_fragmentation_invariance() {
    for data in [GET_REQUEST, POST_REQUEST] {
        let whole = read_in_chunks(data, data.len()).await.unwrap();

        for chunk_size in [1, 2, 3, 7, 16, 1000] {
            let fragmented = read_in_chunks(data, chunk_size).await.unwrap();
            assert_eq!(fragmented, whole, "chunk size {chunk_size}");
        }
    }
}

#[tokio::test]
async fn test_get_headers_parsed() {
    let request = read_in_chunks(GET_REQUEST, 3).await.unwrap();

    assert_eq!(request.method(), "GET");
    assert_eq!(request.header("Host"), Some("localhost:42069"));
    assert_eq!(request.header("user-agent"), Some("curl/7.81.0"));
    assert_eq!(request.header("accept"), Some("*/*"));
}

#[tokio::test]
async fn test_body_parsed() {
    let request = read_in_chunks(POST_REQUEST, 5).await.unwrap();

    assert_eq!(request.target(), "/submit");
    assert_eq!(request.body, b"hello world!\n");
}

#[tokio::test]
async fn test_binary_body() {
    let data = b"POST /upload HTTP/1.1\r\nContent-Length: 4\r\n\r\n\x00\x01\r\n";
    let request = read_in_chunks(data, 2).await.unwrap();

    assert_eq!(request.body, vec![0, 1, b'\r', b'\n']);
}

#[tokio::test]
async fn test_zero_content_length() {
    let request = read_in_chunks(b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n", 4).await.unwrap();

    assert!(request.body.is_empty());
}

#[tokio::test]
async fn test_missing_content_length_means_empty_body() {
    let data = b"POST / HTTP/1.1\r\nHost: x\r\n\r\nignored";
    let request = read_in_chunks(data, data.len()).await.unwrap();

    assert!(request.body.is_empty());
}

#[tokio::test]
async fn test_body_longer_than_content_length() {
    let data = b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\nabcd";

    // Reads that carry the last declared byte together with the extra one.
    for chunk_size in [2, 4, data.len()] {
        let result = read_in_chunks(data, chunk_size).await;
        assert!(
            matches!(result, Err(ParseError::BodyOverflow { declared: 3, received: 4 })),
            "chunk size {chunk_size}: {result:?}"
        );
    }
}

#[tokio::test]
async fn test_body_shorter_than_content_length() {
    let result = read_in_chunks(b"POST / HTTP/1.1\r\nContent-Length: 20\r\n\r\npartial content", 4).await;

    assert!(matches!(result, Err(ParseError::IncompleteRequest)));
}

#[tokio::test]
async fn test_eof_in_headers_is_incomplete() {
    let result = read_in_chunks(b"GET / HTTP/1.1\r\nHost: localhost\r\n", 4).await;
    assert!(matches!(result, Err(ParseError::IncompleteRequest)));

    let result = read_in_chunks(b"", 4).await;
    assert!(matches!(result, Err(ParseError::IncompleteRequest)));
}

#[tokio::test]
async fn test_invalid_content_length() {
    let result = read_in_chunks(b"POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\n", 64).await;

    assert!(matches!(result, Err(ParseError::InvalidContentLength(v)) if v == "lots"));
}

#[tokio::test]
async fn test_malformed_header_aborts_request() {
    let result = read_in_chunks(b"GET / HTTP/1.1\r\nHost : x\r\n\r\n", 1).await;

    assert!(matches!(result, Err(ParseError::Header(_))));
}

#[tokio::test]
async fn test_invalid_method_aborts_request() {
    let result = read_in_chunks(b"/coffee HTTP/1.1\r\nHost: x\r\n\r\n", 5).await;
    assert!(matches!(result, Err(ParseError::MalformedRequestLine)));

    let result = read_in_chunks(b"get / HTTP/1.1\r\n\r\n", 5).await;
    assert!(matches!(result, Err(ParseError::InvalidMethod(_))));
}

#[tokio::test]
async fn test_duplicate_headers_merge() {
    let request = read_in_chunks(b"GET / HTTP/1.1\r\nX: a\r\nX: b\r\n\r\n", 2).await.unwrap();

    assert_eq!(request.header("x"), Some("a, b"));
}

#[tokio::test]
async fn test_request_too_large() {
    let mut data = b"GET / HTTP/1.1\r\nX-Long: ".to_vec();
    data.extend(std::iter::repeat_n(b'a', 100));
    data.extend_from_slice(b"\r\n\r\n");

    let mut reader = ChunkedReader::new(data, 16);
    let result = RequestReader::new(8, 64).read_request(&mut reader).await;

    assert!(matches!(result, Err(ParseError::RequestTooLarge(64))));
}

#[tokio::test]
async fn test_declared_body_over_limit_is_rejected_up_front() {
    let data = b"POST / HTTP/1.1\r\nContent-Length: 1000000000\r\n\r\nab";

    let mut reader = ChunkedReader::new(data, 16);
    let result = RequestReader::new(8, 64).read_request(&mut reader).await;

    assert!(matches!(
        result,
        Err(ParseError::BodyTooLarge {
            declared: 1_000_000_000,
            limit: 64
        })
    ));
}

#[test]
fn test_body_at_limit_is_accepted() {
    let mut parser = RequestParser::with_max_body_size(4);

    parser.parse(b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\ndata").unwrap();

    assert_eq!(parser.finish().unwrap().body, b"data");
}

#[tokio::test]
async fn test_read_request_leaves_trailing_bytes_unread() {
    let mut data = GET_REQUEST.to_vec();
    data.extend_from_slice(b"next");

    let mut reader = ChunkedReader::new(data, GET_REQUEST.len());
    let request = read_request(&mut reader).await.unwrap();

    assert_eq!(request.header("host"), Some("localhost:42069"));
    assert_eq!(reader.remaining(), b"next");
}

#[test]
fn test_parser_walks_through_states() {
    let mut parser = RequestParser::new();
    assert_eq!(parser.state(), RequestState::Initialized);

    assert_eq!(parser.parse(b"PUT /x HTTP/1.1\r\n").unwrap(), 17);
    assert_eq!(parser.state(), RequestState::ParsingHeaders);

    assert_eq!(parser.parse(b"Content-Length: 2\r\n").unwrap(), 19);
    assert_eq!(parser.state(), RequestState::ParsingHeaders);

    assert_eq!(parser.parse(b"\r\n").unwrap(), 2);
    assert_eq!(parser.state(), RequestState::ParsingBody);

    assert_eq!(parser.parse(b"o").unwrap(), 1);
    assert_eq!(parser.state(), RequestState::ParsingBody);

    assert_eq!(parser.parse(b"k").unwrap(), 1);
    assert_eq!(parser.state(), RequestState::Done);

    assert!(matches!(parser.parse(b""), Err(ParseError::ParserFinished)));
    assert_eq!(parser.finish().unwrap().body, b"ok");
}

#[test]
fn test_single_parse_handles_whole_head() {
    let mut parser = RequestParser::new();
    let consumed = parser.parse(GET_REQUEST).unwrap();

    assert_eq!(consumed, GET_REQUEST.len());
    assert_eq!(parser.state(), RequestState::Done);
}

#[test]
fn test_body_chunks_summing_past_content_length() {
    let mut parser = RequestParser::new();
    parser.parse(b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\n").unwrap();
    parser.parse(b"ab").unwrap();

    let result = parser.parse(b"cd");
    assert!(matches!(result, Err(ParseError::BodyOverflow { declared: 3, received: 4 })));
}

#[test]
fn test_finish_before_done_yields_nothing() {
    let mut parser = RequestParser::new();
    parser.parse(b"GET / HTTP/1.1\r\n").unwrap();

    assert!(parser.finish().is_none());
}
