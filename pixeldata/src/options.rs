//! Options controlling a pixel data decode.
use dicomkit_encoding::Htj2kDecoder;

/// What a frame index of `-1` stands for.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub enum FrameSentinel {
    /// `-1` is the only frame of a single frame image,
    /// and an error for multi-frame images
    #[default]
    Single,
    /// `-1` selects every frame,
    /// stacked along a leading frame axis
    AllFrames,
}

/// Options for decoding pixel data.
///
/// ```
/// # use dicomkit_pixeldata::DecodeOptions;
/// let options = DecodeOptions::new().frame(2).scaled(true).threads(0);
/// assert_eq!(options.frame, 2);
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
#[non_exhaustive]
pub struct DecodeOptions {
    /// The frame to decode, `-1` for the sentinel (see [`FrameSentinel`])
    pub frame: i64,
    /// Apply the modality transformation (rescale or modality LUT)
    /// and produce `f32` samples when the data set describes one
    pub scaled: bool,
    /// Worker threads: `-1` for all logical CPUs,
    /// `0` for the calling thread only,
    /// any positive number for a pool of that size
    pub threads: i32,
    /// Which implementation decodes HTJ2K frames
    pub htj2k_decoder: Htj2kDecoder,
    /// Interpretation of frame `-1`
    pub frame_sentinel: FrameSentinel,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            frame: -1,
            scaled: false,
            threads: -1,
            htj2k_decoder: Htj2kDecoder::Auto,
            frame_sentinel: FrameSentinel::Single,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(mut self, frame: i64) -> Self {
        self.frame = frame;
        self
    }

    pub fn scaled(mut self, scaled: bool) -> Self {
        self.scaled = scaled;
        self
    }

    pub fn threads(mut self, threads: i32) -> Self {
        self.threads = threads;
        self
    }

    pub fn htj2k_decoder(mut self, decoder: Htj2kDecoder) -> Self {
        self.htj2k_decoder = decoder;
        self
    }

    pub fn frame_sentinel(mut self, sentinel: FrameSentinel) -> Self {
        self.frame_sentinel = sentinel;
        self
    }

    /// Shorthand for decoding all frames at once.
    pub fn all_frames(self) -> Self {
        self.frame(-1).frame_sentinel(FrameSentinel::AllFrames)
    }
}
