//! Animated GIF playback in the image surface.
//!
//! Each timer firing shows exactly one frame and arms at most one more
//! one-shot timer, so the frame rate follows the per-frame delays.

use std::io::Cursor;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat, RgbaImage};
use tracing::{debug, warn};

use super::raster::{decode_image, fit_width};
use crate::scheduler::{Scheduler, TimerHandle, TimerId};
use crate::surfaces::{Icon, ImageContent, PreviewSurfaces};

/// How often the frame sequence is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    /// No looping extension: play once.
    Once,
    Forever,
    /// Play once, then this many more times.
    Extra(u16),
}

#[derive(Debug, Clone)]
struct AnimationFrame {
    image: RgbaImage,
    delay_ms: i32,
}

/// Position inside a decoded animation.
#[derive(Debug, Clone)]
pub struct AnimationCursor {
    frames: Vec<AnimationFrame>,
    index: usize,
    /// `None` loops forever.
    passes_left: Option<u32>,
}

impl AnimationCursor {
    fn new(frames: Vec<AnimationFrame>, loops: LoopCount) -> Self {
        let passes_left = match loops {
            LoopCount::Once => Some(0),
            LoopCount::Forever => None,
            LoopCount::Extra(n) => Some(u32::from(n)),
        };
        Self {
            frames,
            index: 0,
            passes_left,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn frame(&self) -> &RgbaImage {
        &self.frames[self.index].image
    }

    fn is_terminal(&self) -> bool {
        self.index + 1 >= self.frames.len() && self.passes_left == Some(0)
    }

    /// Delay before the next frame, or -1 once the last frame of the last
    /// pass is showing.
    pub fn delay_ms(&self) -> i32 {
        if self.is_terminal() {
            -1
        } else {
            self.frames[self.index].delay_ms
        }
    }

    /// Step to the next frame. Stays put on the terminal frame.
    pub fn advance(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.index += 1;
        if self.index >= self.frames.len() {
            self.index = 0;
            if let Some(passes) = self.passes_left.as_mut() {
                *passes = passes.saturating_sub(1);
            }
        }
    }
}

/// Result of decoding a file on the animation path.
#[derive(Debug)]
pub enum DecodedAnimation {
    Static(RgbaImage),
    Animated(AnimationCursor),
}

/// Decode `bytes` as an animation. Anything that is not a multi-frame GIF
/// comes back as a single static frame. Frames wider than `max_width` are
/// scaled down.
pub fn decode_animation(bytes: &[u8], max_width: u32, min_delay_ms: i32) -> Result<DecodedAnimation> {
    if image::guess_format(bytes).ok() != Some(ImageFormat::Gif) {
        let img = decode_image(bytes)?;
        return Ok(DecodedAnimation::Static(fit_width(img.to_rgba8(), max_width)));
    }

    let loops = loop_count(bytes);
    let decoder = GifDecoder::new(Cursor::new(bytes)).context("Failed to decode GIF")?;
    let raw = decoder
        .into_frames()
        .collect_frames()
        .context("Failed to decode GIF frames")?;

    let mut frames: Vec<AnimationFrame> = raw
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay = if denom == 0 { 0 } else { numer / denom };
            AnimationFrame {
                image: fit_width(frame.into_buffer(), max_width),
                delay_ms: i32::try_from(delay).unwrap_or(i32::MAX).max(min_delay_ms),
            }
        })
        .collect();

    match frames.len() {
        0 => anyhow::bail!("GIF has no frames"),
        1 => Ok(DecodedAnimation::Static(frames.remove(0).image)),
        _ => Ok(DecodedAnimation::Animated(AnimationCursor::new(frames, loops))),
    }
}

/// Read the NETSCAPE2.0 (or ANIMEXTS1.0) looping extension.
pub fn loop_count(bytes: &[u8]) -> LoopCount {
    const IDS: [&[u8]; 2] = [b"NETSCAPE2.0", b"ANIMEXTS1.0"];

    for id in IDS {
        let Some(pos) = bytes.windows(id.len()).position(|w| w == id) else {
            continue;
        };
        let block = &bytes[pos + id.len()..];
        if block.len() >= 4 && block[0] == 3 && block[1] == 1 {
            return match u16::from_le_bytes([block[2], block[3]]) {
                0 => LoopCount::Forever,
                n => LoopCount::Extra(n),
            };
        }
    }
    LoopCount::Once
}

pub struct AnimationController {
    scheduler: Rc<dyn Scheduler>,
    surfaces: Rc<dyn PreviewSurfaces>,
    min_frame_delay_ms: i32,
    cursor: Option<AnimationCursor>,
    timer: Option<TimerHandle>,
}

impl AnimationController {
    pub fn new(
        scheduler: Rc<dyn Scheduler>,
        surfaces: Rc<dyn PreviewSurfaces>,
        min_frame_delay_ms: i32,
    ) -> Self {
        Self {
            scheduler,
            surfaces,
            min_frame_delay_ms,
            cursor: None,
            timer: None,
        }
    }

    /// Decode `path` and start showing it in the image surface.
    pub fn load(&mut self, path: &Path, max_width: i32) {
        self.stop();

        let max_width = u32::try_from(max_width.max(1)).unwrap_or(1);
        let decoded = std::fs::read(path)
            .with_context(|| format!("Failed to read animation: {:?}", path))
            .and_then(|bytes| {
                decode_animation(&bytes, max_width, self.min_frame_delay_ms)
                    .with_context(|| format!("Failed to decode animation: {:?}", path))
            });

        match decoded {
            Err(e) => {
                warn!("{:#}", e);
                self.surfaces
                    .set_image(ImageContent::Icon(Icon::ImageMissing));
            }
            Ok(DecodedAnimation::Static(frame)) => {
                debug!(?path, "GIF is static");
                self.surfaces.set_image(ImageContent::Bitmap(frame));
            }
            Ok(DecodedAnimation::Animated(cursor)) => {
                debug!(?path, frames = cursor.frame_count(), "Starting animation");
                self.surfaces
                    .set_image(ImageContent::Bitmap(cursor.frame().clone()));
                let delay = cursor.delay_ms();
                self.cursor = Some(cursor);
                self.arm(delay);
            }
        }
    }

    /// Show the next frame. Returns `false` for timers this controller does
    /// not own.
    pub fn handle_timer(&mut self, id: TimerId) -> bool {
        if !self.owns_timer(id) {
            return false;
        }
        // The one-shot has fired; its handle is spent.
        self.timer = None;

        let Some(cursor) = self.cursor.as_mut() else {
            return true;
        };
        cursor.advance();
        self.surfaces
            .set_image(ImageContent::Bitmap(cursor.frame().clone()));
        let delay = cursor.delay_ms();
        if delay < 0 {
            debug!("Animation finished");
        }
        self.arm(delay);
        true
    }

    fn arm(&mut self, delay_ms: i32) {
        if delay_ms > 0 {
            let delay = Duration::from_millis(delay_ms as u64);
            self.timer = Some(self.scheduler.schedule_once(delay));
        }
    }

    pub fn owns_timer(&self, id: TimerId) -> bool {
        self.timer.as_ref().is_some_and(|t| t.id() == id)
    }

    /// A frame timer is armed.
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.timer.is_none() && self.cursor.is_none()
    }

    pub fn cursor(&self) -> Option<&AnimationCursor> {
        self.cursor.as_ref()
    }

    /// Release the timer and the decoded frames. Safe to repeat.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.scheduler.cancel(timer);
        }
        if self.cursor.take().is_some() {
            debug!("Animation stopped");
        }
    }
}

impl Drop for AnimationController {
    fn drop(&mut self) {
        if !self.is_stopped() {
            self.stop();
        }
    }
}
