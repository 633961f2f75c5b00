//! Byte sources feeding the reader
//!
//! A source hands out decoded text one chunk at a time, in file order. It is
//! pull-based: the reader asks for the next chunk only when its queue of
//! complete lines has run dry, so "pausing" a source is simply not asking, and
//! destroying it is dropping it.

use std::future::Future;
use std::path::{Component, Path, PathBuf};

use encoding_rs::{CoderResult, Decoder};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::ReaderOptions;
use crate::encoding::{resolve_encoding, TextEncoding};
use crate::error::{ReaderError, Result};

/// Ordered supplier of decoded text chunks
pub trait ByteSource: Send {
    /// Acquire the underlying resource. Called once, before any chunk is read.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Read and decode the next chunk.
    ///
    /// Returns `Ok(None)` once the input is exhausted; later calls keep
    /// returning `Ok(None)`.
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Streaming decoder state
enum TextDecoder {
    /// Single-byte mapping; `mask` clears bits of every byte
    Bytes { mask: u8 },
    Whatwg(Decoder),
}

impl TextDecoder {
    fn new(encoding: TextEncoding, strip_bom: bool) -> Self {
        match encoding {
            TextEncoding::Latin1 => TextDecoder::Bytes { mask: 0xFF },
            TextEncoding::Ascii => TextDecoder::Bytes { mask: 0x7F },
            TextEncoding::Whatwg(encoding) if strip_bom => {
                TextDecoder::Whatwg(encoding.new_decoder_with_bom_removal())
            }
            TextEncoding::Whatwg(encoding) => {
                TextDecoder::Whatwg(encoding.new_decoder_without_bom_handling())
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            TextDecoder::Bytes { mask: 0xFF } => "latin1",
            TextDecoder::Bytes { .. } => "ascii",
            TextDecoder::Whatwg(decoder) => decoder.encoding().name(),
        }
    }

    /// Decode `input`, flushing any partial sequence when `last` is set
    fn decode(&mut self, input: &[u8], last: bool) -> String {
        match self {
            TextDecoder::Bytes { mask } => {
                input.iter().map(|&byte| char::from(byte & *mask)).collect()
            }
            TextDecoder::Whatwg(decoder) => decode_whatwg(decoder, input, last),
        }
    }
}

fn decode_whatwg(decoder: &mut Decoder, mut input: &[u8], last: bool) -> String {
    let mut text = String::with_capacity(
        decoder
            .max_utf8_buffer_length(input.len())
            .unwrap_or(input.len()),
    );

    loop {
        let (result, read, _had_errors) = decoder.decode_to_string(input, &mut text, last);
        input = &input[read..];

        match result {
            CoderResult::InputEmpty => return text,
            CoderResult::OutputFull => {
                let needed = decoder
                    .max_utf8_buffer_length(input.len())
                    .unwrap_or(input.len());
                text.reserve(needed.max(16));
            }
        }
    }
}

/// Decoding source over any tokio reader
pub struct StreamSource<R> {
    reader: R,
    decoder: TextDecoder,
    buf: Vec<u8>,
    finished: bool,
}

impl<R> std::fmt::Debug for StreamSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSource")
            .field("encoding", &self.decoder.name())
            .field("chunk_size", &self.buf.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl<R: AsyncRead + Unpin + Send> StreamSource<R> {
    /// Create a source reading at most `chunk_size` bytes at a time.
    ///
    /// `strip_bom` only applies to encodings that define a byte order mark.
    pub fn new(
        reader: R,
        encoding: impl Into<TextEncoding>,
        chunk_size: usize,
        strip_bom: bool,
    ) -> Self {
        Self {
            reader,
            decoder: TextDecoder::new(encoding.into(), strip_bom),
            buf: vec![0u8; chunk_size.max(1)],
            finished: false,
        }
    }
}

impl<R: AsyncRead + Unpin + Send> ByteSource for StreamSource<R> {
    async fn open(&mut self) -> Result<()> {
        Ok(())
    }

    async fn next_chunk(&mut self) -> Result<Option<String>> {
        if self.finished {
            return Ok(None);
        }

        // One read per chunk: pipes hand over whatever is available
        let filled = self.reader.read(&mut self.buf).await?;
        if filled == 0 {
            self.finished = true;
        }

        let text = self.decoder.decode(&self.buf[..filled], self.finished);
        if self.finished && text.is_empty() {
            return Ok(None);
        }

        Ok(Some(text))
    }
}

/// Source reading a file from disk
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    encoding: String,
    chunk_size: usize,
    strip_bom: bool,
    inner: Option<StreamSource<File>>,
}

impl FileSource {
    /// Create a source for `path`; nothing is opened until [`ByteSource::open`]
    pub fn new(path: impl AsRef<Path>, options: &ReaderOptions) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            encoding: options.encoding.clone(),
            chunk_size: options.chunk_size,
            strip_bom: options.strip_bom,
            inner: None,
        }
    }

    /// The normalized path this source reads
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    async fn open(&mut self) -> Result<()> {
        let encoding = resolve_encoding(&self.encoding)?;
        if self.chunk_size == 0 {
            return Err(ReaderError::Config(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        let file = File::open(&self.path)
            .await
            .map_err(|source| ReaderError::Open {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), encoding = encoding.name(), "opened file");
        self.inner = Some(StreamSource::new(
            file,
            encoding,
            self.chunk_size,
            self.strip_bom,
        ));
        Ok(())
    }

    async fn next_chunk(&mut self) -> Result<Option<String>> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(ReaderError::Config(format!(
                "{} was read before it was opened",
                self.path.display()
            )));
        };

        inner.next_chunk().await.map_err(|err| match err {
            ReaderError::Io(source) => ReaderError::Read {
                path: self.path.clone(),
                source,
            },
            other => other,
        })
    }
}

/// Normalize a path lexically.
///
/// `.` segments are dropped and `..` cancels a preceding normal segment; the
/// filesystem is not consulted, so symlinks are not resolved. An empty result
/// becomes `.`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }

    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn collect_chunks<S: ByteSource>(source: &mut S) -> Vec<String> {
        source.open().await.unwrap();
        let mut chunks = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    fn cursor(bytes: &[u8]) -> Cursor<Vec<u8>> {
        Cursor::new(bytes.to_vec())
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("a/./b")), PathBuf::from("a/b"));
        assert_eq!(normalize_path(Path::new("a/../b")), PathBuf::from("b"));
        assert_eq!(normalize_path(Path::new("./a/b/../../c")), PathBuf::from("c"));
        assert_eq!(normalize_path(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(normalize_path(Path::new("")), PathBuf::from("."));
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_absolute_path() {
        assert_eq!(normalize_path(Path::new("/tmp//x/../y")), PathBuf::from("/tmp/y"));
        assert_eq!(normalize_path(Path::new("/../etc")), PathBuf::from("/etc"));
    }

    #[tokio::test]
    async fn test_chunks_follow_chunk_size() {
        let mut source = StreamSource::new(cursor(b"abcdefgh"), encoding_rs::UTF_8, 3, false);
        assert_eq!(collect_chunks(&mut source).await, vec!["abc", "def", "gh"]);

        // Exhausted sources stay exhausted
        assert_eq!(source.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() {
        // "é" is two bytes in UTF-8; a chunk size of 1 cuts it in half
        let mut source = StreamSource::new(cursor("aé".as_bytes()), encoding_rs::UTF_8, 1, false);
        let text: String = collect_chunks(&mut source).await.concat();
        assert_eq!(text, "aé");
    }

    #[tokio::test]
    async fn test_truncated_sequence_becomes_replacement_char() {
        let mut source = StreamSource::new(cursor(b"ok\xE3\x81"), encoding_rs::UTF_8, 64, false);
        let text: String = collect_chunks(&mut source).await.concat();
        assert_eq!(text, "ok\u{FFFD}");
    }

    #[tokio::test]
    async fn test_latin1_decoding() {
        let mut source = StreamSource::new(
            cursor(b"caf\xE9\n"),
            resolve_encoding("latin1").unwrap(),
            64,
            false,
        );
        assert_eq!(collect_chunks(&mut source).await, vec!["café\n"]);
    }

    #[tokio::test]
    async fn test_latin1_maps_c1_bytes_to_same_code_points() {
        let mut source = StreamSource::new(
            cursor(b"\x80\x93\x9F\xFF\n"),
            resolve_encoding("binary").unwrap(),
            2,
            false,
        );
        let text: String = collect_chunks(&mut source).await.concat();
        assert_eq!(text, "\u{80}\u{93}\u{9F}\u{FF}\n");
    }

    #[tokio::test]
    async fn test_iso_8859_1_label_keeps_web_mapping() {
        let mut source = StreamSource::new(
            cursor(b"\x93q\x94"),
            resolve_encoding("iso-8859-1").unwrap(),
            64,
            false,
        );
        assert_eq!(collect_chunks(&mut source).await.concat(), "\u{201C}q\u{201D}");
    }

    #[tokio::test]
    async fn test_ascii_clears_high_bit() {
        let mut source = StreamSource::new(
            cursor(b"\xE1b\n"),
            resolve_encoding("ascii").unwrap(),
            64,
            false,
        );
        assert_eq!(collect_chunks(&mut source).await.concat(), "ab\n");
    }

    #[tokio::test]
    async fn test_utf16le_decoding() {
        let bytes: Vec<u8> = "hi\n".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let mut source = StreamSource::new(Cursor::new(bytes), encoding_rs::UTF_16LE, 3, false);
        let text: String = collect_chunks(&mut source).await.concat();
        assert_eq!(text, "hi\n");
    }

    #[tokio::test]
    async fn test_bom_kept_or_stripped() {
        let bytes = b"\xEF\xBB\xBFline";

        let mut source = StreamSource::new(cursor(bytes), encoding_rs::UTF_8, 64, false);
        assert_eq!(collect_chunks(&mut source).await.concat(), "\u{FEFF}line");

        let mut source = StreamSource::new(cursor(bytes), encoding_rs::UTF_8, 64, true);
        assert_eq!(collect_chunks(&mut source).await.concat(), "line");
    }

    #[tokio::test]
    async fn test_empty_input_has_no_chunks() {
        let mut source = StreamSource::new(cursor(b""), encoding_rs::UTF_8, 8, false);
        assert!(collect_chunks(&mut source).await.is_empty());
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let mut source = FileSource::new(
            "/nonexistent/dir/./file.txt",
            &ReaderOptions::default(),
        );
        assert_eq!(source.path(), Path::new("/nonexistent/dir/file.txt"));

        let err = source.open().await.unwrap_err();
        match err {
            ReaderError::Open { path, source } => {
                assert_eq!(path, PathBuf::from("/nonexistent/dir/file.txt"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected open error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_file_source_rejects_bad_encoding_before_opening() {
        let options = ReaderOptions {
            encoding: "hex".to_string(),
            ..ReaderOptions::default()
        };
        let mut source = FileSource::new("/nonexistent/file.txt", &options);

        let err = source.open().await.unwrap_err();
        assert!(matches!(err, ReaderError::UnsupportedEncoding { .. }));
    }
}
