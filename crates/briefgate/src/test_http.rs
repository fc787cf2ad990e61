//! One-shot local HTTP server for exercising the outbound clients.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request as the server received it.
#[derive(Debug)]
pub struct Received {
    /// Request line and headers.
    pub head: String,
    /// Request body.
    pub body: String,
}

impl Received {
    /// Value of header `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then_some(value.trim())
        })
    }
}

/// Serve exactly one request with `status` and a JSON `body`.
///
/// Returns the URL to call and a handle resolving to the received request.
pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/endpoint", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 4096];

        let head_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim()
                    .eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);

        while buf.len() < head_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending the body");
            buf.extend_from_slice(&chunk[..n]);
        }

        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;

        Received {
            head,
            body: String::from_utf8_lossy(&buf[head_end..head_end + content_length]).into_owned(),
        }
    });

    (url, handle)
}
