use std::io;

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

/// Newline-delimited reader that refuses to buffer past a fixed line length.
pub type LineReader<R> = FramedRead<R, LinesCodec>;

/// Bytes a line of `max_chars` characters can occupy: four per UTF-8 scalar
/// plus a trailing `\r`.
pub fn max_line_bytes(max_chars: usize) -> usize {
    max_chars.saturating_mul(4).saturating_add(1)
}

/// Wraps `inner` so no line longer than `max_chars` characters is ever held
/// in memory whole.
pub fn line_reader<R: AsyncRead>(inner: R, max_chars: usize) -> LineReader<R> {
    FramedRead::new(inner, LinesCodec::new_with_max_length(max_line_bytes(max_chars)))
}

/// Swaps the length cap while keeping anything already buffered.
pub fn relimit<R>(reader: &mut LineReader<R>, max_chars: usize) {
    *reader.decoder_mut() = LinesCodec::new_with_max_length(max_line_bytes(max_chars));
}

/// Reads one line, stripped of `\n` or `\r\n`.
///
/// Returns `Ok(None)` once the peer has closed the stream. A line that grows
/// past the cap fails with `MaxLineLengthExceeded` as soon as the cap is
/// crossed; the reader should not be polled again after that.
pub async fn read_line<R>(reader: &mut LineReader<R>) -> Result<Option<String>, LinesCodecError>
where
    R: AsyncRead + Unpin,
{
    reader.next().await.transpose()
}

/// Writes `text` followed by a newline and flushes so peers see it promptly.
///
/// Multi-line text goes out as several lines in one write.
pub async fn write_line<W>(writer: &mut W, text: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = Vec::with_capacity(text.len() + 1);
    encoded.extend_from_slice(text.as_bytes());
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}
