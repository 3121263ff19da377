// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logger + secret masker (§4.7).
//!
//! The executor's logging is ordinary `tracing`; masking is layered in as a
//! `MakeWriter` that intercepts the already-formatted bytes `tracing-subscriber`
//! is about to write and runs them through [`crate::secrets::mask`] before
//! they reach the terminal. This keeps masking orthogonal to formatting: any
//! `tracing` call site anywhere in the workspace is covered for free.

use std::io;
use tracing_subscriber::fmt::MakeWriter;

/// A `std::io::Write` that buffers one line at a time, masks it, then
/// forwards to the real writer. Lines, not arbitrary chunks, because a
/// secret could straddle two `write` calls otherwise.
pub struct MaskingWriter<W> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: io::Write> MaskingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, buf: Vec::new() }
    }

    fn flush_line(&mut self, through_newline: bool) -> io::Result<()> {
        let text = String::from_utf8_lossy(&self.buf).into_owned();
        let masked = crate::secrets::mask(&text);
        self.inner.write_all(masked.as_bytes())?;
        if through_newline {
            self.inner.write_all(b"\n")?;
        }
        self.buf.clear();
        Ok(())
    }
}

impl<W: io::Write> io::Write for MaskingWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        for &byte in data {
            if byte == b'\n' {
                self.flush_line(true)?;
            } else {
                self.buf.push(byte);
            }
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.flush_line(false)?;
        }
        self.inner.flush()
    }
}

/// `MakeWriter` producing a fresh [`MaskingWriter`] over stdout per log event,
/// as `tracing-subscriber` expects.
#[derive(Clone, Copy, Default)]
pub struct MaskingMakeWriter;

impl<'a> MakeWriter<'a> for MaskingMakeWriter {
    type Writer = MaskingWriter<io::Stdout>;

    fn make_writer(&'a self) -> Self::Writer {
        MaskingWriter::new(io::stdout())
    }
}

/// Install the process-wide `tracing` subscriber. `verbose` selects `debug`
/// as the maximum level instead of `info`, per §6's `-v/--verbose` flag.
///
/// Safe to call more than once; subsequent calls are ignored (the first
/// subscriber wins), matching `tracing`'s own global-dispatch semantics.
pub fn init(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(MaskingMakeWriter)
        .with_target(false)
        .try_init();
}
