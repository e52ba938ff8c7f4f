/*!
resp.rs

Minimal RESP (REdis Serialization Protocol) codec, which is what Tile38 speaks
on its TCP port.

Requests are always arrays of bulk strings. Replies may be any of the five
RESP2 types; with `OUTPUT json` active Tile38 answers with a bulk string
holding a JSON document, but `AUTH` and errors can still arrive as simple
strings / error frames.
*/

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::TransportError;

/// Largest bulk string accepted from the server (Redis `proto-max-bulk-len`).
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Upper bound on array slots reserved before the elements actually arrive.
const ARRAY_PREALLOC: usize = 1024;

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Vec<u8>),
    Null,
    Array(Vec<Frame>),
}

impl Frame {
    /// Text content of a scalar reply. Error frames become `TransportError::Server`.
    pub fn into_text(self) -> Result<String, TransportError> {
        match self {
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(b) => String::from_utf8(b)
                .map_err(|_| TransportError::Protocol("reply is not valid UTF-8".into())),
            Frame::Integer(i) => Ok(i.to_string()),
            Frame::Error(e) => Err(TransportError::Server(e)),
            Frame::Null => Err(TransportError::Protocol("unexpected null reply".into())),
            Frame::Array(_) => Err(TransportError::Protocol("unexpected array reply".into())),
        }
    }
}

/// Encode a command as a RESP array of bulk strings.
pub fn encode_command(parts: &[&str]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + parts.iter().map(|p| p.len() + 16).sum::<usize>());
    out.extend_from_slice(format!("*{}\r\n", parts.len()).as_bytes());
    for p in parts {
        out.extend_from_slice(format!("${}\r\n", p.len()).as_bytes());
        out.extend_from_slice(p.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

pub async fn write_command<W>(w: &mut W, parts: &[&str]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    w.write_all(&encode_command(parts)).await?;
    w.flush().await?;
    Ok(())
}

/// Read one complete frame.
pub async fn read_frame<R>(r: &mut R) -> Result<Frame, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(r).await?;
    let (tag, rest) = line
        .split_at_checked(1)
        .ok_or_else(|| TransportError::Protocol("empty reply line".into()))?;

    match tag {
        "+" => Ok(Frame::Simple(rest.to_string())),
        "-" => Ok(Frame::Error(rest.to_string())),
        ":" => Ok(Frame::Integer(parse_len(rest)?)),
        "$" => {
            let len = parse_len(rest)?;
            if len < 0 {
                return Ok(Frame::Null);
            }
            if len > MAX_BULK_LEN {
                return Err(TransportError::Protocol(format!(
                    "bulk length {len} too large"
                )));
            }
            let mut buf = vec![0u8; len as usize + 2];
            r.read_exact(&mut buf).await?;
            if !buf.ends_with(b"\r\n") {
                return Err(TransportError::Protocol("bulk string not terminated".into()));
            }
            buf.truncate(len as usize);
            Ok(Frame::Bulk(buf))
        }
        "*" => {
            let len = parse_len(rest)?;
            if len < 0 {
                return Ok(Frame::Null);
            }
            let reserve = usize::try_from(len).map_or(ARRAY_PREALLOC, |n| n.min(ARRAY_PREALLOC));
            let mut items = Vec::with_capacity(reserve);
            for _ in 0..len {
                items.push(Box::pin(read_frame(&mut *r)).await?);
            }
            Ok(Frame::Array(items))
        }
        other => Err(TransportError::Protocol(format!(
            "unknown reply type '{other}'"
        ))),
    }
}

async fn read_line<R>(r: &mut R) -> Result<String, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = r.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Err(TransportError::Protocol("connection closed by server".into()));
    }
    if !buf.ends_with(b"\r\n") {
        return Err(TransportError::Protocol("reply line not terminated".into()));
    }
    buf.truncate(buf.len() - 2);
    String::from_utf8(buf).map_err(|_| TransportError::Protocol("reply is not valid UTF-8".into()))
}

fn parse_len(s: &str) -> Result<i64, TransportError> {
    s.parse::<i64>()
        .map_err(|_| TransportError::Protocol(format!("invalid length '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode(bytes: &[u8]) -> Result<Frame, TransportError> {
        let mut r = bytes;
        read_frame(&mut r).await
    }

    #[test]
    fn encodes_bulk_array() {
        let out = encode_command(&["SCAN", "fleet"]);
        assert_eq!(out, b"*2\r\n$4\r\nSCAN\r\n$5\r\nfleet\r\n".to_vec());
    }

    #[tokio::test]
    async fn decodes_scalars() {
        assert_eq!(decode(b"+OK\r\n").await.unwrap(), Frame::Simple("OK".into()));
        assert_eq!(
            decode(b"-ERR nope\r\n").await.unwrap(),
            Frame::Error("ERR nope".into())
        );
        assert_eq!(decode(b":42\r\n").await.unwrap(), Frame::Integer(42));
        assert_eq!(decode(b"$-1\r\n").await.unwrap(), Frame::Null);
    }

    #[tokio::test]
    async fn decodes_bulk_json() {
        let frame = decode(b"$11\r\n{\"ok\":true}\r\n").await.unwrap();
        assert_eq!(frame.into_text().unwrap(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn decodes_nested_array() {
        let frame = decode(b"*2\r\n$1\r\na\r\n*1\r\n:1\r\n").await.unwrap();
        assert_eq!(
            frame,
            Frame::Array(vec![
                Frame::Bulk(b"a".to_vec()),
                Frame::Array(vec![Frame::Integer(1)])
            ])
        );
    }

    #[tokio::test]
    async fn error_frame_becomes_server_error() {
        let err = decode(b"-invalid password\r\n")
            .await
            .unwrap()
            .into_text()
            .unwrap_err();
        assert!(matches!(err, TransportError::Server(m) if m == "invalid password"));
    }

    #[tokio::test]
    async fn truncated_input_is_protocol_error() {
        assert!(matches!(
            decode(b"").await,
            Err(TransportError::Protocol(_))
        ));
        assert!(matches!(
            decode(b"?what\r\n").await,
            Err(TransportError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn oversized_bulk_length_is_rejected() {
        let err = decode(b"$9223372036854775807\r\n").await.unwrap_err();
        assert!(matches!(err, TransportError::Protocol(m) if m.contains("too large")));

        let just_over = format!("${}\r\n", MAX_BULK_LEN + 1);
        assert!(matches!(
            decode(just_over.as_bytes()).await,
            Err(TransportError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn huge_array_count_fails_without_allocating() {
        // Declared count far beyond what follows: runs out of input instead of reserving it
        assert!(matches!(
            decode(b"*9223372036854775807\r\n:1\r\n").await,
            Err(TransportError::Protocol(_))
        ));
    }
}
