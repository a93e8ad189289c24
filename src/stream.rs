//! Frame streams of raw binary samples.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    analysis::{Analysis, Status},
    error::AnalysisError,
};

/// Binary encoding of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleFormat {
    #[default]
    F32Le,
    F32Be,
    F64Le,
    F64Be,
}

impl SampleFormat {
    pub fn size(self) -> usize {
        match self {
            Self::F32Le | Self::F32Be => 4,
            Self::F64Le | Self::F64Be => 8,
        }
    }

    fn read(self, mut data: impl Read) -> io::Result<f64> {
        match self {
            Self::F32Le => data.read_f32::<LittleEndian>().map(f64::from),
            Self::F32Be => data.read_f32::<BigEndian>().map(f64::from),
            Self::F64Le => data.read_f64::<LittleEndian>(),
            Self::F64Be => data.read_f64::<BigEndian>(),
        }
    }

    fn write(self, mut data: impl Write, value: f64) -> io::Result<()> {
        match self {
            Self::F32Le => data.write_f32::<LittleEndian>(value as f32),
            Self::F32Be => data.write_f32::<BigEndian>(value as f32),
            Self::F64Le => data.write_f64::<LittleEndian>(value),
            Self::F64Be => data.write_f64::<BigEndian>(value),
        }
    }
}

/// Reads fixed-length frames, widening every sample to `f64`.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    format: SampleFormat,
    frame: Vec<f64>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R, format: SampleFormat) -> Self {
        Self {
            inner,
            format,
            frame: Vec::new(),
        }
    }

    /// Read the next frame of `len` samples.
    ///
    /// Returns `None` at the end of the stream. A trailing frame shorter than
    /// `len` is dropped.
    pub fn read_frame(&mut self, len: usize) -> io::Result<Option<&[f64]>> {
        self.frame.clear();
        for _ in 0..len {
            match self.format.read(&mut self.inner) {
                Ok(v) => self.frame.push(v),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    if !self.frame.is_empty() {
                        tracing::debug!(samples = self.frame.len(), "dropped partial frame");
                    }
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Some(&self.frame))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
    format: SampleFormat,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W, format: SampleFormat) -> Self {
        Self { inner, format }
    }

    pub fn write_frame(&mut self, frame: &[f64]) -> io::Result<()> {
        for v in frame {
            self.format.write(&mut self.inner, *v)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// What to do with a frame whose analysis fails numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SingularPolicy {
    /// Stop the stream at the failing frame.
    #[default]
    Abort,
    /// Write nothing for the failing frame and continue.
    Skip,
}

/// Frame counts of a processed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamSummary {
    /// Complete frames read.
    pub frames: usize,
    pub converged: usize,
    pub max_iterations_reached: usize,
    pub skipped: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Analysis failed at frame {frame}: {source}")]
    Analysis {
        frame: usize,
        #[source]
        source: AnalysisError,
    },
}

/// Analyze every frame of `reader` and write the estimates to `writer`.
///
/// Configuration errors always stop the stream; numerical failures follow
/// `policy`. The writer is flushed before returning successfully.
pub fn process<A, R, W>(
    analysis: &mut A,
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    policy: SingularPolicy,
) -> Result<StreamSummary, StreamError>
where
    A: Analysis,
    R: Read,
    W: Write,
{
    let len = analysis.input_length();
    let mut summary = StreamSummary::default();

    while let Some(frame) = reader.read_frame(len)? {
        let index = summary.frames;
        summary.frames += 1;

        let estimate = match analysis.analyze(frame) {
            Ok(estimate) => estimate,
            Err(source) if source.is_numerical() && policy == SingularPolicy::Skip => {
                tracing::warn!(frame = index, error = %source, "skipped frame");
                summary.skipped += 1;
                continue;
            }
            Err(source) => {
                return Err(StreamError::Analysis {
                    frame: index,
                    source,
                });
            }
        };

        match estimate.status {
            Status::Converged { .. } => summary.converged += 1,
            Status::MaxIterationsReached => {
                tracing::warn!(
                    frame = index,
                    last = estimate.history.last().copied(),
                    "maximum number of iterations reached"
                );
                summary.max_iterations_reached += 1;
            }
        }
        writer.write_frame(&estimate.cepstrum)?;
    }

    writer.flush()?;
    tracing::info!(
        frames = summary.frames,
        skipped = summary.skipped,
        max_iterations_reached = summary.max_iterations_reached,
        "stream finished"
    );
    Ok(summary)
}
