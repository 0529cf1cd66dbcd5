use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use crate::error::{Error, Result};
use crate::render::Frame;




/**
 * An ordered output sequence of rendered frames, written only by the
 * animation driver. `finish` is called once after a completed run; `discard`
 * is called instead when the run is aborted, and must release whatever was
 * partially written.
 */
pub trait FrameSink {

    fn capture(&mut self, index: usize, frame: &Frame) -> Result<()>;

    fn finish(&mut self) -> Result<()>;

    fn discard(&mut self);

    /// Whether frames should be rendered out for this sink at all.
    fn enabled(&self) -> bool {
        true
    }
}




/// The sink used when a run should not capture anything.
pub struct NoCapture;

impl FrameSink for NoCapture {
    fn capture(&mut self, _index: usize, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn discard(&mut self) {}

    fn enabled(&self) -> bool {
        false
    }
}




/// Keeps captured frames in memory, in capture order.
#[derive(Default)]
pub struct FrameBuffer {
    frames: Vec<(usize, Frame)>,
    finished: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[(usize, Frame)] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for FrameBuffer {
    fn capture(&mut self, index: usize, frame: &Frame) -> Result<()> {
        self.frames.push((index, frame.clone()));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }

    fn discard(&mut self) {
        self.frames.clear();
        self.finished = false;
    }
}




/**
 * Writes frames to a file as a sequence of CBOR records, one `(index,
 * frame)` pair per capture. Frames go to `<path>.partial` while the run is in
 * progress; `finish` moves the file into place and `discard` (or dropping an
 * unfinished writer) deletes it, so an aborted run never leaves a truncated
 * file at `path`.
 */
pub struct FrameFile {
    path: PathBuf,
    partial: PathBuf,
    writer: Option<BufWriter<File>>,
    count: usize,
    closed: bool,
}




// ============================================================================
impl FrameFile {

    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut partial = path.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        let writer = BufWriter::new(File::create(&partial)?);

        debug!("writing frames to {}", partial.display());

        Ok(Self {
            path,
            partial,
            writer: Some(writer),
            count: 0,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn partial_path(&self) -> &Path {
        &self.partial
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl FrameSink for FrameFile {
    fn capture(&mut self, index: usize, frame: &Frame) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::Capture {
            index,
            reason: "frame file is already closed".into(),
        })?;

        ciborium::ser::into_writer(&(index, frame), writer).map_err(|e| Error::Capture {
            index,
            reason: format!("{:?}", e),
        })?;
        self.count += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        self.writer = None;
        fs::rename(&self.partial, &self.path)?;
        self.closed = true;
        info!("wrote {} frames to {}", self.count, self.path.display());
        Ok(())
    }

    /// Delete the partial file unless `finish` has already moved it into
    /// place. This includes the case where `finish` failed part way.
    fn discard(&mut self) {
        if self.closed {
            return;
        }
        self.writer = None;
        self.closed = true;

        match fs::remove_file(&self.partial) {
            Ok(()) => info!("discarded {} partial frames", self.count),
            Err(e) => warn!("could not remove {}: {}", self.partial.display(), e),
        }
    }
}

impl Drop for FrameFile {
    fn drop(&mut self) {
        self.discard()
    }
}




/**
 * Read back the frames written by a [`FrameFile`].
 */
pub fn read_frames<P: AsRef<Path>>(path: P) -> Result<Vec<(usize, Frame)>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut frames = Vec::new();

    while !reader.fill_buf()?.is_empty() {
        let record: (usize, Frame) =
            ciborium::de::from_reader(&mut reader).map_err(|e| Error::Decode(format!("{:?}", e)))?;
        frames.push(record);
    }
    Ok(frames)
}
