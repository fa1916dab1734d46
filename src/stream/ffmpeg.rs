use std::{
    io::{Read, Write},
    path::PathBuf,
    process::{Child, ChildStderr, Command, Stdio},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender},
    },
    thread::JoinHandle,
    time::Duration,
};

use crate::{
    compile::job::{Operation, TransformJob},
    encode::ffmpeg::EVEN_PAD,
    foundation::error::EncodeError,
    params::set::SourceRef,
    stream::{
        CaptureStream, Clock, EncoderEvent, EncoderSettings, Frame, IncrementalEncoder,
        MediaSource, Pacing, SourcePoll, WallClock,
    },
};

/// Decoded frames buffered ahead of playback.
const DECODE_AHEAD: usize = 8;
/// How long the encoder writer waits for a frame before re-checking the stop flag.
const WRITER_POLL: Duration = Duration::from_millis(20);
const READ_CHUNK: usize = 64 * 1024;

type StderrDrain = JoinHandle<std::io::Result<Vec<u8>>>;

fn drain_stderr(mut stderr: ChildStderr) -> StderrDrain {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        stderr.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
}

fn collect_stderr(handle: Option<StderrDrain>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .and_then(Result::ok)
        .map(|b| String::from_utf8_lossy(&b).trim().to_string())
        .unwrap_or_default()
}

/// Source that decodes the job's input with `ffmpeg` into raw RGBA frames.
///
/// Frames are decoded at source resolution and the output frame rate; trimming happens in
/// the decoder. With [`Pacing::Realtime`] frame `n` is released once the clock passes
/// `n / fps`.
pub struct FfmpegFrameSource<C: Clock = WallClock> {
    binary: PathBuf,
    input: SourceRef,
    width: u32,
    height: u32,
    fps: u32,
    trim: Option<(f64, f64)>,
    pacing: Pacing,
    clock: C,

    spool: Option<tempfile::NamedTempFile>,
    child: Option<Child>,
    frames: Option<Receiver<Frame>>,
    reader: Option<JoinHandle<Result<u64, String>>>,
    stderr: Option<StderrDrain>,
    delivered: u64,
    ended: bool,
}

impl FfmpegFrameSource<WallClock> {
    pub fn from_job(
        binary: impl Into<PathBuf>,
        job: &TransformJob,
        pacing: Pacing,
    ) -> Result<Self, EncodeError> {
        Self::with_clock(binary, job, pacing, WallClock::default())
    }
}

impl<C: Clock> FfmpegFrameSource<C> {
    pub fn with_clock(
        binary: impl Into<PathBuf>,
        job: &TransformJob,
        pacing: Pacing,
        clock: C,
    ) -> Result<Self, EncodeError> {
        let (width, height) = job
            .params()
            .source_stats()
            .dimensions()
            .ok_or_else(|| EncodeError::open("source dimensions are unknown"))?;
        let fps = job
            .output_frame_rate()
            .filter(|f| *f > 0)
            .ok_or_else(|| EncodeError::open("source needs a positive frame rate"))?;
        let trim = job.operations().iter().find_map(|op| match op {
            Operation::Trim { start, end } => Some((*start, *end)),
            _ => None,
        });

        Ok(Self {
            binary: binary.into(),
            input: job.source().clone(),
            width,
            height,
            fps,
            trim,
            pacing,
            clock,
            spool: None,
            child: None,
            frames: None,
            reader: None,
            stderr: None,
            delivered: 0,
            ended: false,
        })
    }

    /// Arguments after the binary name; `input` is the spooled source path.
    pub(crate) fn decode_args(&self, input: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(String::from)
            .collect();
        if let Some((start, end)) = self.trim {
            args.extend([
                "-ss".to_string(),
                format!("{start:.3}"),
                "-t".to_string(),
                format!("{:.3}", end - start),
            ]);
        }
        args.extend(["-i".to_string(), input.to_string(), "-an".to_string()]);
        args.extend(
            [
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-vf",
                &format!("scale={}:{}", self.width, self.height),
                "-r",
                &self.fps.to_string(),
                "pipe:1",
            ]
            .map(String::from),
        );
        args
    }

    fn frame_due(&self) -> bool {
        match self.pacing {
            Pacing::Unthrottled => true,
            Pacing::Realtime => {
                let due = Duration::from_secs_f64(self.delivered as f64 / f64::from(self.fps));
                self.clock.position() >= due
            }
        }
    }

    fn finish_decoder(&mut self) -> Result<(), EncodeError> {
        let read = match self.reader.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| EncodeError::run("decoder reader thread panicked"))?,
            None => Ok(0),
        };
        let status = match self.child.take() {
            Some(mut child) => Some(
                child
                    .wait()
                    .map_err(|e| EncodeError::run(format!("failed to wait for decoder: {e}")))?,
            ),
            None => None,
        };
        let stderr = collect_stderr(self.stderr.take());

        if let Some(status) = status
            && !status.success()
        {
            return Err(EncodeError::run(format!(
                "decoder exited with status {status}: {stderr}"
            )));
        }
        read.map_err(EncodeError::run)?;
        Ok(())
    }
}

impl<C: Clock> MediaSource for FfmpegFrameSource<C> {
    fn play(&mut self) -> Result<(), EncodeError> {
        if self.child.is_some() {
            return Err(EncodeError::open("source is already playing"));
        }

        let mut spool = tempfile::NamedTempFile::new()
            .map_err(|e| EncodeError::open(format!("failed to create source spool: {e}")))?;
        spool
            .write_all(self.input.bytes())
            .and_then(|()| spool.flush())
            .map_err(|e| EncodeError::write(format!("failed to spool source: {e}")))?;
        let input = spool.path().to_string_lossy().into_owned();

        let mut child = Command::new(&self.binary)
            .args(self.decode_args(&input))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EncodeError::open(format!(
                    "failed to spawn {} (is it installed and on PATH?): {e}",
                    self.binary.display()
                ))
            })?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| EncodeError::open("failed to open decoder stdout (unexpected)"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EncodeError::open("failed to open decoder stderr (unexpected)"))?;

        let (w, h) = (self.width, self.height);
        let frame_len = (w as usize) * (h as usize) * 4;
        let (tx, rx): (SyncSender<Frame>, Receiver<Frame>) = mpsc::sync_channel(DECODE_AHEAD);
        let reader = std::thread::spawn(move || {
            let mut count = 0u64;
            loop {
                let mut data = vec![0u8; frame_len];
                match read_full(&mut stdout, &mut data) {
                    Ok(0) => return Ok(count),
                    Ok(n) if n == frame_len => {}
                    Ok(n) => return Err(format!("truncated frame: {n} of {frame_len} bytes")),
                    Err(e) => return Err(format!("failed to read decoded frame: {e}")),
                }
                if tx
                    .send(Frame {
                        width: w,
                        height: h,
                        data,
                    })
                    .is_err()
                {
                    return Ok(count);
                }
                count += 1;
            }
        });

        self.spool = Some(spool);
        self.child = Some(child);
        self.frames = Some(rx);
        self.reader = Some(reader);
        self.stderr = Some(drain_stderr(stderr));
        self.delivered = 0;
        self.ended = false;
        self.clock.reset_to(Duration::ZERO);
        tracing::debug!(w, h, fps = self.fps, pacing = ?self.pacing, "decoder started");
        Ok(())
    }

    fn poll_frame(&mut self) -> Result<SourcePoll, EncodeError> {
        if self.ended {
            return Ok(SourcePoll::Ended);
        }
        let Some(frames) = self.frames.as_ref() else {
            return Err(EncodeError::run("source is not playing"));
        };
        if !self.frame_due() {
            return Ok(SourcePoll::Pending);
        }

        match frames.try_recv() {
            Ok(frame) => {
                self.delivered += 1;
                Ok(SourcePoll::Frame(frame))
            }
            Err(mpsc::TryRecvError::Empty) => Ok(SourcePoll::Pending),
            Err(mpsc::TryRecvError::Disconnected) => {
                self.frames = None;
                self.ended = true;
                self.finish_decoder()?;
                tracing::debug!(frames = self.delivered, "decoder reached end of stream");
                Ok(SourcePoll::Ended)
            }
        }
    }

    fn stop(&mut self) {
        self.frames = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        let _ = collect_stderr(self.stderr.take());
        self.spool = None;
    }
}

impl<C: Clock> Drop for FfmpegFrameSource<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fill `buf` unless EOF comes first; returns the number of bytes read.
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Incremental encoder running `ffmpeg` on raw RGBA frames from stdin.
///
/// A writer thread feeds captured frames to stdin; a reader thread forwards stdout as
/// [`EncoderEvent::Chunk`]s. `stop` lets the writer drain what was already captured and close
/// stdin; the reader reports [`EncoderEvent::Stopped`] after ffmpeg exits cleanly.
pub struct FfmpegIncrementalEncoder {
    binary: PathBuf,
    child: Arc<Mutex<Option<Child>>>,
    stop: Arc<AtomicBool>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl Default for FfmpegIncrementalEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegIncrementalEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            child: Arc::new(Mutex::new(None)),
            stop: Arc::new(AtomicBool::new(false)),
            writer: None,
            reader: None,
        }
    }
}

/// Arguments after the binary name for an encoder fed raw frames on stdin.
pub(crate) fn encoder_args(settings: &EncoderSettings) -> Vec<String> {
    let bitrate = settings.bitrate.max(1);
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
        &format!("{}x{}", settings.width, settings.height),
        "-r",
        &settings.fps.to_string(),
        "-i",
        "pipe:0",
        "-an",
    ]
    .map(String::from)
    .to_vec();

    let odd = settings.width % 2 != 0 || settings.height % 2 != 0;
    let codec: &[&str] = match settings.mime {
        "video/webm" => &["-c:v", "libvpx", "-f", "webm"],
        "video/ogg" => &["-c:v", "libtheora", "-f", "ogg"],
        // Fragmented MP4 can be written to a pipe.
        _ => {
            if odd {
                args.extend(["-vf".to_string(), EVEN_PAD.to_string()]);
            }
            &[
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "frag_keyframe+empty_moov",
                "-f",
                "mp4",
            ]
        }
    };
    args.extend([
        "-b:v".to_string(),
        bitrate.to_string(),
        "-maxrate".to_string(),
        bitrate.to_string(),
        "-bufsize".to_string(),
        (bitrate * 2).to_string(),
    ]);
    args.extend(codec.iter().map(|s| s.to_string()));
    args.push("pipe:1".to_string());
    args
}

impl IncrementalEncoder for FfmpegIncrementalEncoder {
    fn open(
        &mut self,
        stream: CaptureStream,
        settings: &EncoderSettings,
        events: Sender<EncoderEvent>,
    ) -> Result<(), EncodeError> {
        if self.writer.is_some() {
            return Err(EncodeError::open("encoder is already open"));
        }
        if (stream.width, stream.height) != (settings.width, settings.height) {
            return Err(EncodeError::open(format!(
                "capture stream is {}x{}, encoder expects {}x{}",
                stream.width, stream.height, settings.width, settings.height
            )));
        }

        let mut child = Command::new(&self.binary)
            .args(encoder_args(settings))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EncodeError::open(format!(
                    "failed to spawn {} (is it installed and on PATH?): {e}",
                    self.binary.display()
                ))
            })?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EncodeError::open("failed to open encoder stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| EncodeError::open("failed to open encoder stdout (unexpected)"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EncodeError::open("failed to open encoder stderr (unexpected)"))?;
        let stderr_drain = drain_stderr(stderr);

        if let Ok(mut slot) = self.child.lock() {
            *slot = Some(child);
        }
        self.stop.store(false, Ordering::SeqCst);

        let frame_len = (settings.width as usize) * (settings.height as usize) * 4;
        let stop = Arc::clone(&self.stop);
        let writer_events = events.clone();
        let frames = stream.frames;
        self.writer = Some(std::thread::spawn(move || {
            loop {
                match frames.recv_timeout(WRITER_POLL) {
                    Ok(frame) => {
                        if frame.data.len() != frame_len {
                            let _ = writer_events.send(EncoderEvent::Failed(EncodeError::write(
                                "captured frame does not match encoder size",
                            )));
                            break;
                        }
                        if let Err(e) = stdin.write_all(&frame.data) {
                            let _ = writer_events.send(EncoderEvent::Failed(EncodeError::write(
                                format!("failed to write frame to encoder stdin: {e}"),
                            )));
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if stop.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            drop(stdin);
        }));

        let child_slot = Arc::clone(&self.child);
        self.reader = Some(std::thread::spawn(move || {
            let mut buf = vec![0u8; READ_CHUNK];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if events.send(EncoderEvent::Chunk(buf[..n].to_vec())).is_err() {
                            return;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        let _ = events.send(EncoderEvent::Failed(EncodeError::read(format!(
                            "failed to read encoder output: {e}"
                        ))));
                        return;
                    }
                }
            }

            let child = child_slot.lock().ok().and_then(|mut slot| slot.take());
            let Some(mut child) = child else {
                // Closed underneath us.
                return;
            };
            let event = match child.wait() {
                Ok(status) if status.success() => EncoderEvent::Stopped,
                Ok(status) => EncoderEvent::Failed(EncodeError::flush(format!(
                    "encoder exited with status {status}: {}",
                    collect_stderr(Some(stderr_drain))
                ))),
                Err(e) => EncoderEvent::Failed(EncodeError::flush(format!(
                    "failed to wait for encoder: {e}"
                ))),
            };
            let _ = events.send(event);
        }));

        tracing::debug!(
            bitrate = settings.bitrate,
            mime = settings.mime,
            "incremental encoder opened"
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EncodeError> {
        if self.writer.is_none() {
            return Err(EncodeError::flush("encoder is not open"));
        }
        self.stop.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let child = self.child.lock().ok().and_then(|mut slot| slot.take());
        if let Some(mut child) = child {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for FfmpegIncrementalEncoder {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream/ffmpeg.rs"]
mod tests;
