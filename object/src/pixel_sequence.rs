//! Encapsulated pixel data:
//! the basic offset table, the fragments, and how fragments form frames.
//!
//! Fragments are kept in stream order.
//! A frame is a contiguous run of fragments,
//! which is what a codec backend consumes.
use std::ops::Range;

use smallvec::SmallVec;
use tracing::warn;

/// How to group the fragments of a pixel sequence
/// without a basic offset table
/// when their number does not match Number of Frames.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FrameGrouping {
    /// Start a new frame after every fragment which ends
    /// with an end-of-image marker (`FF D9`),
    /// for codecs which produce one.
    /// Other codecs keep every fragment in a single frame.
    #[default]
    Inferred,
    /// Keep every fragment in frame 0.
    SingleFrame,
}

/// One item of an encapsulated pixel data element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Absolute offset of the item header in the source stream,
    /// zero for fragments created in memory.
    pub offset: u64,
    /// The fragment bytes, without the item header.
    pub data: Vec<u8>,
}

impl Fragment {
    /// Create a fragment which did not come from a stream.
    pub fn new(data: Vec<u8>) -> Self {
        Fragment { offset: 0, data }
    }

    /// The size of this fragment in an encoded pixel sequence,
    /// item header and padding included.
    fn encoded_len(&self) -> usize {
        8 + self.data.len() + (self.data.len() & 1)
    }
}

/// The value of an encapsulated pixel data element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelSequence {
    offset_table: Vec<u32>,
    fragments: Vec<Fragment>,
    frames: SmallVec<[Range<usize>; 2]>,
    grouping_inferred: bool,
}

/// The fragments of one frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    fragments: &'a [Fragment],
}

impl<'a> Frame<'a> {
    /// The fragments of the frame, in order.
    pub fn fragments(&self) -> &'a [Fragment] {
        self.fragments
    }

    /// The total number of encoded bytes in the frame.
    pub fn encoded_len(&self) -> usize {
        self.fragments.iter().map(|f| f.data.len()).sum()
    }
}

impl PixelSequence {
    /// Create a pixel sequence out of its offset table and fragments,
    /// without grouping them into frames yet.
    ///
    /// Call [`group_frames`](Self::group_frames) before accessing frames,
    /// otherwise all fragments form a single frame.
    pub fn new(offset_table: Vec<u32>, fragments: Vec<Fragment>) -> Self {
        let mut seq = PixelSequence {
            offset_table,
            fragments,
            frames: SmallVec::new(),
            grouping_inferred: false,
        };
        seq.frames = seq.single_frame();
        seq
    }

    /// Whether the sequence has a non-empty basic offset table.
    pub fn has_offset_table(&self) -> bool {
        !self.offset_table.is_empty()
    }

    /// The basic offset table, empty when absent.
    pub fn offset_table(&self) -> &[u32] {
        &self.offset_table
    }

    /// All fragments, in stream order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// The number of fragments.
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Append a fragment to the last frame.
    pub fn push_fragment(&mut self, data: Vec<u8>) {
        self.fragments.push(Fragment::new(data));
        let end = self.fragments.len();
        match self.frames.last_mut() {
            Some(last) => last.end = end,
            None => self.frames.push(0..end),
        }
    }

    /// Append a fragment forming a new frame of its own.
    pub fn push_frame(&mut self, data: Vec<u8>) {
        let start = self.fragments.len();
        self.fragments.push(Fragment::new(data));
        self.frames.push(start..start + 1);
        if !self.offset_table.is_empty() {
            self.offset_table = self.computed_offset_table();
        }
    }

    /// The number of frames.
    pub fn number_of_frames(&self) -> usize {
        self.frames.len()
    }

    /// The fragments of frame `index`.
    pub fn frame(&self, index: usize) -> Option<Frame<'_>> {
        let range = self.frames.get(index)?;
        self.fragments
            .get(range.clone())
            .map(|fragments| Frame { fragments })
    }

    /// The encoded bytes of frame `index`,
    /// which is the concatenation of its fragments.
    pub fn frame_encoded_bytes(&self, index: usize) -> Option<Vec<u8>> {
        let frame = self.frame(index)?;
        let mut out = Vec::with_capacity(frame.encoded_len());
        for fragment in frame.fragments() {
            out.extend_from_slice(&fragment.data);
        }
        Some(out)
    }

    /// Whether the frames were inferred from fragment contents
    /// rather than from the offset table or Number of Frames.
    pub fn grouping_inferred(&self) -> bool {
        self.grouping_inferred
    }

    /// The basic offset table which describes the current frames:
    /// the position of each frame's first fragment item,
    /// relative to the first item after the offset table.
    pub fn computed_offset_table(&self) -> Vec<u32> {
        let mut positions = Vec::with_capacity(self.fragments.len() + 1);
        let mut position = 0_usize;
        for fragment in &self.fragments {
            positions.push(position);
            position += fragment.encoded_len();
        }
        positions.push(position);
        self.frames
            .iter()
            .map(|range| positions[range.start] as u32)
            .collect()
    }

    /// The basic offset table to encode with the fragments.
    ///
    /// This is the stored table when it already describes the frames,
    /// or when there is at most one frame
    /// or one fragment per frame without a table.
    /// Otherwise the table is computed from the current frames,
    /// so that they can be told apart when read back.
    pub fn encoded_offset_table(&self) -> Vec<u32> {
        if self.frames.len() <= 1 {
            return self.offset_table.clone();
        }
        let computed = self.computed_offset_table();
        let one_per_frame = self.frames.len() == self.fragments.len();
        if !self.grouping_inferred
            && (self.offset_table == computed || (one_per_frame && self.offset_table.is_empty()))
        {
            self.offset_table.clone()
        } else {
            computed
        }
    }

    /// Group the fragments into frames.
    ///
    /// With an offset table, each offset starts a frame.
    /// Without one, each fragment is a frame
    /// when there are as many fragments as `number_of_frames`,
    /// otherwise `grouping` decides;
    /// `ends_with_eoi` tells whether the codec of the transfer syntax
    /// terminates frames with an end-of-image marker.
    pub fn group_frames(
        &mut self,
        number_of_frames: Option<u32>,
        grouping: FrameGrouping,
        ends_with_eoi: bool,
    ) {
        self.grouping_inferred = false;
        if self.fragments.is_empty() {
            self.frames.clear();
            return;
        }

        if !self.offset_table.is_empty() {
            match self.frames_from_offset_table() {
                Some(frames) => {
                    self.frames = frames;
                    return;
                }
                None => warn!(
                    "Basic offset table {:?} does not match the fragments, ignoring it",
                    self.offset_table
                ),
            }
        }

        if number_of_frames.map(|n| n as usize) == Some(self.fragments.len()) {
            self.frames = (0..self.fragments.len()).map(|i| i..i + 1).collect();
            return;
        }

        self.frames = match grouping {
            FrameGrouping::Inferred if ends_with_eoi => {
                self.grouping_inferred = true;
                self.frames_from_eoi_markers()
            }
            _ => self.single_frame(),
        };
    }

    fn single_frame(&self) -> SmallVec<[Range<usize>; 2]> {
        if self.fragments.is_empty() {
            SmallVec::new()
        } else {
            smallvec::smallvec![0..self.fragments.len()]
        }
    }

    /// Map each offset to the fragment item starting there.
    /// Offsets must be increasing and land on item boundaries.
    fn frames_from_offset_table(&self) -> Option<SmallVec<[Range<usize>; 2]>> {
        let mut starts = Vec::with_capacity(self.offset_table.len());
        let mut position = 0_usize;
        let mut index = 0;
        for &offset in &self.offset_table {
            let offset = offset as usize;
            while index < self.fragments.len() && position < offset {
                position += self.fragments[index].encoded_len();
                index += 1;
            }
            if position != offset || index >= self.fragments.len() {
                return None;
            }
            if starts.last().map_or(false, |&last| last >= index) {
                return None;
            }
            starts.push(index);
        }
        let mut frames: SmallVec<[Range<usize>; 2]> = SmallVec::with_capacity(starts.len());
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(self.fragments.len());
            frames.push(start..end);
        }
        Some(frames)
    }

    fn frames_from_eoi_markers(&self) -> SmallVec<[Range<usize>; 2]> {
        let mut frames = SmallVec::new();
        let mut start = 0;
        for (i, fragment) in self.fragments.iter().enumerate() {
            if ends_with_eoi_marker(&fragment.data) {
                frames.push(start..i + 1);
                start = i + 1;
            }
        }
        if start < self.fragments.len() {
            frames.push(start..self.fragments.len());
        }
        frames
    }
}

/// Whether the data ends with `FF D9`, ignoring trailing zero padding.
fn ends_with_eoi_marker(data: &[u8]) -> bool {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    end >= 2 && data[end - 2] == 0xFF && data[end - 1] == 0xD9
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_like(body: u8) -> Vec<u8> {
        vec![0xFF, 0xD8, body, body, 0xFF, 0xD9]
    }

    fn sequence(offset_table: Vec<u32>, fragments: Vec<Vec<u8>>) -> PixelSequence {
        PixelSequence::new(offset_table, fragments.into_iter().map(Fragment::new).collect())
    }

    #[test]
    fn one_fragment_is_one_frame() {
        let mut seq = sequence(vec![], vec![vec![1, 2, 3, 4]]);
        seq.group_frames(None, FrameGrouping::Inferred, false);
        assert_eq!(seq.number_of_frames(), 1);
        assert_eq!(seq.frame(0).unwrap().fragments().len(), 1);
        assert_eq!(seq.frame(0).unwrap().encoded_len(), 4);
        assert!(seq.frame(1).is_none());
    }

    #[test]
    fn offset_table_drives_frames() {
        // fragment items take 8 + 4, 8 + 2, 8 + 6 bytes
        let mut seq = sequence(vec![0, 22], vec![vec![1; 4], vec![2; 2], vec![3; 6]]);
        seq.group_frames(Some(2), FrameGrouping::SingleFrame, false);
        assert_eq!(seq.number_of_frames(), 2);
        assert_eq!(seq.frame(0).unwrap().fragments().len(), 2);
        assert_eq!(seq.frame_encoded_bytes(0).unwrap(), vec![1, 1, 1, 1, 2, 2]);
        assert_eq!(seq.frame_encoded_bytes(1).unwrap(), vec![3; 6]);
        assert!(!seq.grouping_inferred());
    }

    #[test]
    fn bad_offset_table_falls_back() {
        let mut seq = sequence(vec![0, 5], vec![vec![1; 4], vec![2; 2]]);
        seq.group_frames(Some(2), FrameGrouping::SingleFrame, false);
        // fragment count matches Number of Frames
        assert_eq!(seq.number_of_frames(), 2);
    }

    #[test]
    fn fragment_count_matches_number_of_frames() {
        let mut seq = sequence(vec![], vec![vec![1; 2], vec![2; 2], vec![3; 2]]);
        seq.group_frames(Some(3), FrameGrouping::SingleFrame, false);
        assert_eq!(seq.number_of_frames(), 3);
    }

    #[test]
    fn eoi_markers_split_frames() {
        let mut first = jpeg_like(1);
        first.truncate(4);
        let tail = vec![1, 1, 0xFF, 0xD9, 0x00];
        let mut seq = sequence(vec![], vec![first, tail, jpeg_like(2)]);
        seq.group_frames(Some(2), FrameGrouping::Inferred, true);
        assert_eq!(seq.number_of_frames(), 2);
        assert_eq!(seq.frame(0).unwrap().fragments().len(), 2);
        assert!(seq.grouping_inferred());
        // (8 + 4) + (8 + 6)
        assert_eq!(seq.computed_offset_table(), vec![0, 26]);
    }

    #[test]
    fn single_frame_policy_keeps_fragments_together() {
        let mut seq = sequence(vec![], vec![jpeg_like(1), jpeg_like(2)]);
        seq.group_frames(Some(3), FrameGrouping::SingleFrame, true);
        assert_eq!(seq.number_of_frames(), 1);
        seq.group_frames(Some(3), FrameGrouping::Inferred, false);
        assert_eq!(seq.number_of_frames(), 1);
    }

    #[test]
    fn frames_of_several_fragments_get_an_offset_table() {
        let mut seq = PixelSequence::default();
        seq.push_frame(vec![1, 2]);
        seq.push_fragment(vec![3, 4]);
        seq.push_frame(vec![5, 6]);
        assert!(!seq.has_offset_table());
        assert_eq!(seq.encoded_offset_table(), vec![0, 20]);

        // one fragment per frame is recovered from Number of Frames
        let mut seq = PixelSequence::default();
        seq.push_frame(vec![1, 2]);
        seq.push_frame(vec![3, 4]);
        assert!(seq.encoded_offset_table().is_empty());

        // all fragments in one frame
        let mut seq = PixelSequence::default();
        seq.push_fragment(vec![1, 2]);
        seq.push_fragment(vec![3, 4]);
        assert!(seq.encoded_offset_table().is_empty());
    }

    #[test]
    fn pushing_frames() {
        let mut seq = PixelSequence::default();
        seq.push_frame(vec![1, 2]);
        seq.push_frame(vec![3, 4, 5]);
        seq.push_fragment(vec![6]);
        assert_eq!(seq.number_of_frames(), 2);
        assert_eq!(seq.frame_encoded_bytes(1).unwrap(), vec![3, 4, 5, 6]);
        assert_eq!(seq.computed_offset_table(), vec![0, 10]);
    }
}
