use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;

/// Decodes frames from a video file via ffmpeg-next (libavformat + libavcodec).
///
/// Each decoded frame is converted to RGB24 and wrapped in a [`Frame`].
/// Playback is paced to the container frame rate so a file behaves like a
/// live camera rather than a decode-as-fast-as-possible burst. Once the
/// stream is exhausted, [`next_frame`](FrameSource::next_frame) returns
/// `Ok(None)` forever.
pub struct VideoFileSource {
    path: PathBuf,
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    decoder: Option<ffmpeg_next::decoder::Video>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    video_stream_index: usize,
    width: u32,
    height: u32,
    frame_interval: Option<Duration>,
    last_emit: Option<Instant>,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

// Safety: VideoFileSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for VideoFileSource {}

impl VideoFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            input_ctx: None,
            decoder: None,
            scaler: None,
            video_stream_index: 0,
            width: 0,
            height: 0,
            frame_interval: None,
            last_emit: None,
            frame_index: 0,
            flushing: false,
            done: false,
        }
    }

    /// Pulls the next decoded frame out of the decoder, if one is ready.
    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let decoder = self.decoder.as_mut()?;
        let scaler = self.scaler.as_mut()?;

        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
            if let Err(e) = scaler.run(&decoded, &mut rgb_frame) {
                return Some(Err(Box::new(e)));
            }

            let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
            let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
            self.frame_index += 1;
            Some(Ok(frame))
        } else {
            None
        }
    }

    /// Feeds packets into the decoder until a frame comes out or the
    /// stream ends. Returns `None` once the decoder is fully drained.
    fn decode_next(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let packet = {
                let ictx = self.input_ctx.as_mut()?;
                ictx.packets().next()
            };

            let Some((stream, packet)) = packet else {
                if let Some(decoder) = self.decoder.as_mut() {
                    let _ = decoder.send_eof();
                }
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            let decoder = self.decoder.as_mut()?;
            if decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }

    /// Sleeps so frames come out at roughly the container frame rate.
    fn pace(&mut self) {
        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_emit) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_emit = Some(Instant::now());
    }
}

impl FrameSource for VideoFileSource {
    fn start(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.input_ctx.is_some() {
            return Ok(());
        }

        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(&self.path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!(
            "opened video file {} ({}x{} @ {:.2} fps)",
            self.path.display(),
            width,
            height,
            fps
        );

        self.video_stream_index = video_stream_index;
        self.width = width;
        self.height = height;
        self.frame_interval = if fps > 0.0 {
            Some(Duration::from_secs_f64(1.0 / fps))
        } else {
            None
        };
        self.last_emit = None;
        self.frame_index = 0;
        self.flushing = false;
        self.done = false;
        self.decoder = Some(decoder);
        self.scaler = Some(scaler);
        self.input_ctx = Some(ictx);

        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.input_ctx.is_none() {
            return Err("VideoFileSource: not started".into());
        }

        match self.decode_next() {
            Some(Ok(frame)) => {
                self.pace();
                Ok(Some(frame))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn stop(&mut self) {
        self.scaler = None;
        self.decoder = None;
        self.input_ctx = None;
        self.last_emit = None;
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row
/// (stride > width*3); this strips the padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
