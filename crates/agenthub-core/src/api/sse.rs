use futures_core::Stream;
use futures_util::{StreamExt, future};
use std::pin::Pin;
use tokio_util::bytes::Bytes;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use crate::api::error::StreamError;

/// Prefix marking a line that carries a JSON payload.
pub const DATA_PREFIX: &str = "data: ";

/// Longest line buffered before the body is rejected.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Payload strings (prefix stripped) in arrival order.
pub type DataLineStream = Pin<Box<dyn Stream<Item = Result<String, StreamError>> + Send>>;

/// Splits a response body into `data: ` payloads.
///
/// Lines are cut on the `\n` byte before UTF-8 decoding, so a character
/// split across two chunks is reassembled. A trailing `\r` is dropped and a
/// last line without terminator is still yielded at end of stream. Lines
/// without the prefix are discarded. A line longer than [`MAX_LINE_LENGTH`]
/// ends the stream with [`StreamError::Decode`].
pub fn data_lines<S, E>(byte_stream: S) -> DataLineStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let byte_stream = byte_stream.map(|result| result.map_err(std::io::Error::other));
    let reader = StreamReader::new(byte_stream);

    let codec = LinesCodec::new_with_max_length(MAX_LINE_LENGTH);
    let lines = FramedRead::new(reader, codec).filter_map(|line| {
        future::ready(match line {
            Ok(line) => line
                .strip_prefix(DATA_PREFIX)
                .map(|payload| Ok(payload.to_string())),
            Err(e) => Some(Err(StreamError::from(e))),
        })
    });

    Box::pin(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunks(parts: &[&'static [u8]]) -> DataLineStream {
        let parts: Vec<_> = parts
            .iter()
            .copied()
            .map(|p| Ok::<_, std::io::Error>(Bytes::from_static(p)))
            .collect();
        data_lines(stream::iter(parts))
    }

    async fn collect(mut lines: DataLineStream) -> Vec<Result<String, StreamError>> {
        let mut out = Vec::new();
        while let Some(line) = lines.next().await {
            out.push(line);
        }
        out
    }

    #[tokio::test]
    async fn test_strips_prefix_and_ignores_other_lines() {
        let lines = chunks(&[
            b": keep-alive\n",
            b"data: {\"content\":\"a\"}\n",
            b"event: ping\n\n",
            b"data: {\"done\":true}\n",
        ]);
        let out = collect(lines).await;
        assert_eq!(
            out,
            vec![
                Ok("{\"content\":\"a\"}".to_string()),
                Ok("{\"done\":true}".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() {
        let lines = chunks(&[b"da", b"ta: {\"cont", b"ent\":\"x\"}\r\n"]);
        assert_eq!(
            collect(lines).await,
            vec![Ok("{\"content\":\"x\"}".to_string())]
        );
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() {
        // "é" is 0xC3 0xA9
        let lines = chunks(&[b"data: caf\xC3", b"\xA9\n"]);
        assert_eq!(collect(lines).await, vec![Ok("café".to_string())]);
    }

    #[tokio::test]
    async fn test_unterminated_last_line_is_kept() {
        let lines = chunks(&[b"data: {\"done\":true}"]);
        assert_eq!(
            collect(lines).await,
            vec![Ok("{\"done\":true}".to_string())]
        );
    }

    #[tokio::test]
    async fn test_prefix_requires_space() {
        let lines = chunks(&[b"data:{\"content\":\"a\"}\n"]);
        assert!(collect(lines).await.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"data: one\n")),
            Err(std::io::Error::other("connection reset")),
        ]);
        let out = collect(data_lines(body)).await;
        assert_eq!(out.first(), Some(&Ok("one".to_string())));
        assert!(matches!(
            out.get(1),
            Some(Err(StreamError::Transport { .. }))
        ));
    }

    #[tokio::test]
    async fn test_overlong_line_is_a_decode_error() {
        let mut line = DATA_PREFIX.as_bytes().to_vec();
        line.resize(MAX_LINE_LENGTH + 1, b'a');
        let body = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from(line)),
            Ok(Bytes::from_static(b"\ndata: next\n")),
        ]);
        let out = collect(data_lines(body)).await;
        assert_eq!(
            out.first(),
            Some(&Err(StreamError::Decode {
                details: "line too long".to_string()
            }))
        );
    }
}
