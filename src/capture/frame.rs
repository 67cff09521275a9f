//! Request framing over a raw byte stream.
//!
//! # Responsibilities
//! - Read exactly one HTTP/1.x request from a socket, without framework help
//! - Tolerate arbitrary chunking and mid-transmission pauses
//! - Decide completion from the header terminator plus `Content-Length`,
//!   or heuristically via an idle read timeout
//!
//! # Design Decisions
//! - The idle timeout is a completion signal, never an error: honeypot
//!   clients routinely stop sending without closing or signalling end-of-body
//! - A zero-byte read (peer closed) ends the frame immediately
//! - Unparsable `Content-Length` values count as 0
//! - Frames are capped at `max_frame_bytes`; excess input is truncated

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

const READ_CHUNK_BYTES: usize = 4096;
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Tunable framing policy.
#[derive(Debug, Clone)]
pub struct FramePolicy {
    /// How long to wait for more bytes before concluding the transmission
    /// is finished.
    pub idle_timeout: Duration,
    /// Upper bound on the captured frame size.
    pub max_frame_bytes: usize,
}

impl Default for FramePolicy {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(500),
            max_frame_bytes: 1024 * 1024,
        }
    }
}

/// Read one request frame from `stream`.
///
/// Returns whatever bytes arrived before the frame was judged complete,
/// which may be empty if the peer sent nothing at all.
pub async fn read_frame<S>(stream: &mut S, policy: &FramePolicy) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut frame: Vec<u8> = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_BYTES];
    let mut expected_len: Option<usize> = None;

    loop {
        let n = match timeout(policy.idle_timeout, stream.read(&mut chunk)).await {
            // Idle peer: treat the transmission as finished.
            Err(_elapsed) => break,
            Ok(read) => read?,
        };
        if n == 0 {
            break;
        }
        frame.extend_from_slice(&chunk[..n]);

        if frame.len() >= policy.max_frame_bytes {
            tracing::warn!(
                frame_bytes = frame.len(),
                limit = policy.max_frame_bytes,
                "Frame exceeds capture limit, truncating"
            );
            frame.truncate(policy.max_frame_bytes);
            break;
        }

        if expected_len.is_none() {
            if let Some(header_end) = find_terminator(&frame) {
                let body_len = declared_body_len(&frame[..header_end]);
                expected_len = Some(header_end + HEADER_TERMINATOR.len() + body_len);
            }
        }

        if let Some(total) = expected_len {
            if frame.len() >= total {
                frame.truncate(total);
                break;
            }
        }
    }

    Ok(frame)
}

/// Offset of the `\r\n\r\n` header terminator, if present.
pub(crate) fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}

/// Extract the declared body length from a raw header block.
///
/// Case-insensitive key match; absent or unparsable values count as 0.
fn declared_body_len(head: &[u8]) -> usize {
    let head = String::from_utf8_lossy(head);
    for line in head.split("\r\n").skip(1) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("content-length") {
            return value.trim().parse().unwrap_or(0);
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn quick_policy() -> FramePolicy {
        FramePolicy {
            idle_timeout: Duration::from_millis(200),
            ..FramePolicy::default()
        }
    }

    #[tokio::test]
    async fn body_split_across_delayed_chunks_is_read_exactly() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let writer = tokio::spawn(async move {
            client
                .write_all(b"POST /x HTTP/1.1\r\nContent-Length: 5\r\n\r\n")
                .await
                .unwrap();
            for part in [b"he".as_slice(), b"ll".as_slice(), b"o".as_slice()] {
                tokio::time::sleep(Duration::from_millis(30)).await;
                client.write_all(part).await.unwrap();
            }
            // Keep the connection open; completion must come from the
            // declared length, not from close or timeout.
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        let frame = read_frame(&mut server, &quick_policy()).await.unwrap();
        assert!(frame.ends_with(b"\r\n\r\nhello"));
        assert_eq!(
            frame.len(),
            b"POST /x HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello".len()
        );
        writer.abort();
    }

    #[tokio::test]
    async fn bodyless_request_completes_before_the_idle_timeout() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let writer = tokio::spawn(async move {
            client
                .write_all(b"GET / HTTP/1.1\r\nHost: h\r\n\r\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let started = std::time::Instant::now();
        let policy = FramePolicy {
            idle_timeout: Duration::from_secs(2),
            ..FramePolicy::default()
        };
        let frame = read_frame(&mut server, &policy).await.unwrap();
        assert!(frame.ends_with(b"\r\n\r\n"));
        assert!(started.elapsed() < Duration::from_secs(1));
        writer.abort();
    }

    #[tokio::test]
    async fn peer_close_ends_the_frame() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(b"GET / HTTP/1.1\r\nContent-").await.unwrap();
        drop(client);

        let frame = read_frame(&mut server, &quick_policy()).await.unwrap();
        assert_eq!(frame, b"GET / HTTP/1.1\r\nContent-");
    }

    #[tokio::test]
    async fn idle_timeout_ends_an_incomplete_body() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client
            .write_all(b"POST /x HTTP/1.1\r\nContent-Length: 100\r\n\r\nshort")
            .await
            .unwrap();

        let frame = read_frame(&mut server, &quick_policy()).await.unwrap();
        assert!(frame.ends_with(b"short"));
    }

    #[tokio::test]
    async fn unparsable_content_length_counts_as_zero() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let writer = tokio::spawn(async move {
            client
                .write_all(b"POST /x HTTP/1.1\r\nContent-Length: lots\r\n\r\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let started = std::time::Instant::now();
        let policy = FramePolicy {
            idle_timeout: Duration::from_secs(2),
            ..FramePolicy::default()
        };
        let frame = read_frame(&mut server, &policy).await.unwrap();
        assert!(frame.ends_with(b"\r\n\r\n"));
        assert!(started.elapsed() < Duration::from_secs(1));
        writer.abort();
    }

    #[tokio::test]
    async fn oversized_frame_is_truncated() {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);
        let writer = tokio::spawn(async move {
            let blob = vec![b'a'; 8192];
            loop {
                if client.write_all(&blob).await.is_err() {
                    break;
                }
            }
        });

        let policy = FramePolicy {
            idle_timeout: Duration::from_millis(200),
            max_frame_bytes: 16 * 1024,
        };
        let frame = read_frame(&mut server, &policy).await.unwrap();
        assert_eq!(frame.len(), 16 * 1024);
        writer.abort();
    }
}
