//! Character set transcoding around byte streams

use crate::measure::encode;
use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_8};
use std::io::{self, Read, Write};

const BUFFER_SIZE: usize = 8 * 1024;

/// Record terminator written after each record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Unix-style line feed (\n)
    #[default]
    LF,
    /// Windows-style carriage return + line feed (\r\n)
    CRLF,
    /// Carriage return (\r)
    CR,
    /// Platform native
    Native,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::LF => "\n",
            LineEnding::CRLF => "\r\n",
            LineEnding::CR => "\r",
            LineEnding::Native => {
                if cfg!(windows) {
                    "\r\n"
                } else {
                    "\n"
                }
            }
        }
    }
}

/// Decodes a byte stream in some encoding into UTF-8
///
/// A leading byte order mark is removed. Malformed input surfaces as an
/// [`io::ErrorKind::InvalidData`] error instead of being replaced.
pub struct TranscodingReader<R> {
    inner: R,
    encoding: &'static Encoding,
    decoder: Decoder,
    input: Box<[u8]>,
    input_pos: usize,
    input_len: usize,
    output: Vec<u8>,
    output_pos: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> TranscodingReader<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            encoding,
            decoder: encoding.new_decoder_with_bom_removal(),
            input: vec![0; BUFFER_SIZE].into_boxed_slice(),
            input_pos: 0,
            input_len: 0,
            output: Vec::with_capacity(BUFFER_SIZE),
            output_pos: 0,
            eof: false,
            finished: false,
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    fn fill(&mut self) -> io::Result<()> {
        if self.input_pos == self.input_len && !self.eof {
            self.input_len = self.inner.read(&mut self.input)?;
            self.input_pos = 0;
            self.eof = self.input_len == 0;
        }

        let source = &self.input[self.input_pos..self.input_len];
        let capacity = self
            .decoder
            .max_utf8_buffer_length_without_replacement(source.len())
            .ok_or_else(|| io::Error::other("decode buffer overflow"))?;
        self.output.clear();
        self.output.resize(capacity.max(4), 0);
        self.output_pos = 0;

        let (result, read, written) =
            self.decoder
                .decode_to_utf8_without_replacement(source, &mut self.output, self.eof);
        self.input_pos += read;
        self.output.truncate(written);
        match result {
            DecoderResult::Malformed(_, _) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Malformed {} input", self.encoding.name()),
            )),
            DecoderResult::InputEmpty => {
                self.finished = self.eof;
                Ok(())
            }
            DecoderResult::OutputFull => Ok(()),
        }
    }
}

impl<R: Read> Read for TranscodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.output_pos < self.output.len() {
                let pending = &self.output[self.output_pos..];
                let n = pending.len().min(buf.len());
                buf[..n].copy_from_slice(&pending[..n]);
                self.output_pos += n;
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }
            self.fill()?;
        }
    }
}

/// Encodes UTF-8 written to it into some encoding
///
/// Characters the encoding cannot represent fail the write with
/// [`io::ErrorKind::InvalidData`].
pub struct TranscodingWriter<W: Write> {
    inner: W,
    encoding: &'static Encoding,
    pending: Vec<u8>,
}

impl<W: Write> TranscodingWriter<W> {
    pub fn new(inner: W, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            encoding,
            pending: Vec::new(),
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Flush, failing if a partial character is still buffered
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "incomplete UTF-8 sequence"));
        }
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        let (bytes, unmappable) = encode(text, self.encoding);
        if unmappable {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unmappable character for encoding {}", self.encoding.name()),
            ));
        }
        self.inner.write_all(&bytes)
    }
}

impl<W: Write> Write for TranscodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.encoding == UTF_8 && self.pending.is_empty() && std::str::from_utf8(buf).is_ok() {
            self.inner.write_all(buf)?;
            return Ok(buf.len());
        }
        self.pending.extend_from_slice(buf);
        let pending = std::mem::take(&mut self.pending);
        let valid = match std::str::from_utf8(&pending) {
            Ok(text) => text.len(),
            Err(e) if e.error_len().is_some() => {
                return Err(io::Error::new(io::ErrorKind::InvalidData, e.to_string()));
            }
            Err(e) => e.valid_up_to(),
        };
        let (text, rest) = pending.split_at(valid);
        let text = std::str::from_utf8(text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.write_text(text)?;
        self.pending = rest.to_vec();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
