use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use annotator_extract::{
    EdgeGridCredentials, EdgeGridSigner, EventSource, HttpEventSource, TransportError,
};
use serde_json::json;

/// Answers exactly one HTTP request with `status` and `body`, then hands the
/// raw request head (lowercased) back over the channel.
fn serve_once(status: &'static str, body: &'static str) -> (String, Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
            if line == "\r\n" || line.is_empty() {
                break;
            }
            head.push_str(&line.to_ascii_lowercase());
        }
        let mut payload = vec![0; content_length];
        reader.read_exact(&mut payload).unwrap();

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let mut stream = reader.into_inner();
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        tx.send(head).unwrap();
    });

    (base, rx)
}

fn signer() -> EdgeGridSigner {
    EdgeGridSigner::new(EdgeGridCredentials::new("ct", "cs", "at"))
}

#[test]
fn signed_get_sends_authorization_and_decodes_body() {
    let (base, requests) = serve_once("200 OK", r#"{"events":[],"links":[]}"#);
    let source = HttpEventSource::new(&base, Some(signer()), Duration::from_secs(5)).unwrap();

    let page = source
        .get_json("/event-viewer-api/v1/events?start=2019-03-26T00:00:00Z")
        .unwrap();

    assert_eq!(page, json!({"events": [], "links": []}));
    let head = requests.recv().unwrap();
    assert!(
        head.starts_with("get /event-viewer-api/v1/events?start=2019-03-26t00:00:00z http/1.1"),
        "{head}"
    );
    assert!(head.contains("accept: application/json"), "{head}");
    assert!(
        head.contains("authorization: eg1-hmac-sha256 client_token=ct;access_token=at;timestamp="),
        "{head}"
    );
    assert!(head.contains(";signature="), "{head}");
}

#[test]
fn unsigned_source_sends_no_authorization() {
    let (base, requests) = serve_once("200 OK", r#"{"requests":[]}"#);
    let source = HttpEventSource::new(&base, None, Duration::from_secs(5)).unwrap();

    source.get_json("/eccu-api/v1/requests").unwrap();

    let head = requests.recv().unwrap();
    assert!(!head.contains("authorization:"), "{head}");
}

#[test]
fn error_status_is_reported_with_body() {
    let (base, _requests) = serve_once("503 Service Unavailable", r#"{"title":"busy"}"#);
    let source = HttpEventSource::new(&base, Some(signer()), Duration::from_secs(5)).unwrap();

    let err = source.get_json("/eccu-api/v1/requests").unwrap_err();

    match err {
        TransportError::Status { url, status, body } => {
            assert_eq!(status, 503);
            assert!(url.ends_with("/eccu-api/v1/requests"), "{url}");
            assert_eq!(body, r#"{"title":"busy"}"#);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn non_json_body_is_a_decode_error() {
    let (base, _requests) = serve_once("200 OK", "<html>maintenance</html>");
    let source = HttpEventSource::new(&base, None, Duration::from_secs(5)).unwrap();

    let err = source.get_json("/eccu-api/v1/requests").unwrap_err();

    assert!(matches!(err, TransportError::Decode { .. }), "{err:?}");
}
