//! Flattening of layout trees into byte segments, and the pack/unpack copies
//! built on top of it.
//!
//! Segments come out in canonical order: a depth-first walk where repeated
//! children are emitted once per repetition, shifted by the repetition's
//! position. Pack reads the segments in that order and unpack writes them
//! back in the same order, so `unpack(pack(x))` restores every byte the
//! layout touches.

use crate::error::{Error, Result};
use crate::layout::{Layout, LayoutKind};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A contiguous run of `len` bytes starting `offset` bytes from the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub offset: i64,
    pub len: u64,
}

impl Segment {
    pub fn new(offset: i64, len: u64) -> Segment {
        Segment { offset, len }
    }

    pub fn end(&self) -> i64 {
        self.offset + self.len as i64
    }
}

// Segment list that merges a pushed segment into its predecessor when the
// two touch.
#[derive(Default)]
struct SegmentSink {
    segments: Vec<Segment>,
}

impl SegmentSink {
    fn push(&mut self, offset: i64, len: u64) {
        if let Some(last) = self.segments.last_mut() {
            if last.end() == offset {
                last.len += len;
                return;
            }
        }
        self.segments.push(Segment { offset, len });
    }

    fn extend_shifted(&mut self, segments: &[Segment], shift: i64) {
        for s in segments {
            self.push(s.offset + shift, s.len);
        }
    }
}

/// Flattens `layout` into its canonical, merged segment list.
pub fn flatten(layout: &Layout) -> Vec<Segment> {
    let mut sink = SegmentSink::default();
    emit(layout, &mut sink);
    sink.segments
}

/// Like [`flatten`], but fails if any segment leaves `[0, capacity)`.
pub fn flatten_within(layout: &Layout, capacity: u64) -> Result<Vec<Segment>> {
    let segments = flatten(layout);
    check_capacity(&segments, capacity)?;
    Ok(segments)
}

fn emit(layout: &Layout, sink: &mut SegmentSink) {
    match layout.kind() {
        LayoutKind::Primitive(scalar) => sink.push(0, scalar.size() as u64),
        LayoutKind::Contiguous { count, inner } => {
            let unit = flatten(inner);
            let ext = inner.extent();
            for i in 0..*count as i64 {
                sink.extend_shifted(&unit, i * ext);
            }
        }
        LayoutKind::Strided {
            count,
            block_len,
            stride,
            inner,
        } => {
            let unit = flatten(inner);
            let ext = inner.extent();
            for i in 0..*count as i64 {
                for j in 0..*block_len as i64 {
                    sink.extend_shifted(&unit, (i * stride + j) * ext);
                }
            }
        }
        LayoutKind::Indexed { blocks, inner } => {
            let unit = flatten(inner);
            let ext = inner.extent();
            for block in blocks {
                for j in 0..block.len as i64 {
                    sink.extend_shifted(&unit, (block.offset + j) * ext);
                }
            }
        }
        LayoutKind::Struct { members } => {
            for m in members {
                let unit = flatten(&m.layout);
                let ext = m.layout.extent();
                for i in 0..m.count as i64 {
                    sink.extend_shifted(&unit, m.offset + i * ext);
                }
            }
        }
        LayoutKind::Resized { inner, .. } => emit(inner, sink),
    }
}

fn check_capacity(segments: &[Segment], capacity: u64) -> Result<()> {
    for s in segments {
        if s.offset < 0 || s.end() as u64 > capacity {
            return Err(Error::out_of_bounds(s.offset, s.len, capacity));
        }
    }
    Ok(())
}

/// Pre-flattened copy plan for `count` back-to-back instances of a layout.
/// Instance `i` is shifted by `i * extent`. Building the plan is the
/// expensive part; pack and unpack only walk the segment list.
///
/// Buffers are addressed relative to an origin index: byte offset `o` of
/// the layout is buffer index `origin + o`. [`PackPlan::origin`] is the
/// smallest origin that keeps every segment at a non-negative index, so it
/// is 0 unless the layout reaches below its own origin.
#[derive(Clone, Debug)]
pub struct PackPlan {
    segments: Vec<Segment>,
    packed_len: u64,
    lower: i64,
    upper: i64,
    overlap: Option<i64>,
}

impl PackPlan {
    pub fn new(layout: &Layout) -> Result<PackPlan> {
        PackPlan::with_count(layout, 1)
    }

    pub fn with_count(layout: &Layout, count: u32) -> Result<PackPlan> {
        let overflow = || Error::invalid_layout("pack plan span overflows 64 bits");

        let unit = flatten(layout);
        let ext = layout.extent();

        // every shifted segment ends at or before the last instance's data
        (count.max(1) as i64 - 1)
            .checked_mul(ext)
            .and_then(|shift| shift.checked_add(layout.true_bounds().upper))
            .ok_or_else(overflow)?;

        let mut sink = SegmentSink::default();
        for i in 0..count as i64 {
            sink.extend_shifted(&unit, i * ext);
        }
        let segments = sink.segments;

        let lower = segments.iter().map(|s| s.offset).min().unwrap_or(0);
        let upper = segments.iter().map(Segment::end).max().unwrap_or(0);
        let packed_len = layout
            .size()
            .checked_mul(count as u64)
            .ok_or_else(overflow)?;

        trace!(segments = segments.len(), count, lower, upper, "built pack plan");

        Ok(PackPlan {
            overlap: find_overlap(&segments),
            packed_len,
            lower,
            upper,
            segments,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Length of the packed image, `count * size`.
    pub fn packed_len(&self) -> u64 {
        self.packed_len
    }

    /// First touched byte and one past the last touched byte, relative to
    /// the layout origin.
    pub fn span(&self) -> (i64, i64) {
        (self.lower, self.upper)
    }

    /// Default buffer index of the layout origin.
    pub fn origin(&self) -> usize {
        self.lower.min(0).unsigned_abs() as usize
    }

    /// Bytes a buffer needs to hold every segment at the default origin.
    pub fn buffer_len(&self) -> usize {
        (self.origin() as i64).saturating_add(self.upper).max(0) as usize
    }

    pub fn has_overlap(&self) -> bool {
        self.overlap.is_some()
    }

    pub fn pack(&self, source: &[u8]) -> Result<Vec<u8>> {
        self.pack_at(source, self.origin())
    }

    pub fn pack_at(&self, source: &[u8], origin: usize) -> Result<Vec<u8>> {
        let mut packed = vec![0u8; self.packed_len as usize];
        self.pack_into_at(source, origin, &mut packed)?;
        Ok(packed)
    }

    /// Packs into `out`, which must hold exactly `packed_len` bytes.
    pub fn pack_into(&self, source: &[u8], out: &mut [u8]) -> Result<()> {
        self.pack_into_at(source, self.origin(), out)
    }

    pub fn pack_into_at(&self, source: &[u8], origin: usize, out: &mut [u8]) -> Result<()> {
        self.check_packed(out.len())?;
        let base = self.base(origin, source.len())?;

        let mut position = 0usize;
        for s in &self.segments {
            let start = (base + s.offset) as usize;
            let len = s.len as usize;
            out[position..position + len].copy_from_slice(&source[start..start + len]);
            position += len;
        }

        Ok(())
    }

    /// Writes the packed image back into `dest`. Bytes outside the segments
    /// are left as they are.
    pub fn unpack(&self, packed: &[u8], dest: &mut [u8]) -> Result<()> {
        self.unpack_at(packed, dest, self.origin())
    }

    pub fn unpack_at(&self, packed: &[u8], dest: &mut [u8], origin: usize) -> Result<()> {
        self.check_packed(packed.len())?;
        if let Some(offset) = self.overlap {
            return Err(Error::Overlap { offset });
        }
        let base = self.base(origin, dest.len())?;

        let mut position = 0usize;
        for s in &self.segments {
            let start = (base + s.offset) as usize;
            let len = s.len as usize;
            dest[start..start + len].copy_from_slice(&packed[position..position + len]);
            position += len;
        }

        Ok(())
    }

    fn check_packed(&self, actual: usize) -> Result<()> {
        if actual as u64 != self.packed_len {
            return Err(Error::PackedLength {
                expected: self.packed_len,
                actual: actual as u64,
            });
        }
        Ok(())
    }

    // Checks that the whole span lands inside `[0, capacity)` with the
    // origin at `origin`, and returns the origin as a signed index.
    fn base(&self, origin: usize, capacity: usize) -> Result<i64> {
        let out_of_bounds = || {
            Error::out_of_bounds(
                self.lower,
                self.upper.abs_diff(self.lower),
                capacity as u64,
            )
        };

        let base = i64::try_from(origin).map_err(|_| out_of_bounds())?;
        let first = base.checked_add(self.lower).ok_or_else(out_of_bounds)?;
        let last = base.checked_add(self.upper).ok_or_else(out_of_bounds)?;

        if first < 0 || last as u64 > capacity as u64 {
            return Err(out_of_bounds());
        }
        Ok(base)
    }
}

// Offset of the first byte covered by two segments, if any.
fn find_overlap(segments: &[Segment]) -> Option<i64> {
    let mut sorted = segments.to_vec();
    sorted.sort_unstable_by_key(|s| s.offset);

    sorted
        .windows(2)
        .find(|pair| pair[1].offset < pair[0].end())
        .map(|pair| pair[1].offset)
}

/// Packs one instance of `layout` from `source` into a fresh buffer of
/// exactly `layout.size()` bytes.
pub fn pack(layout: &Layout, source: &[u8]) -> Result<Vec<u8>> {
    PackPlan::new(layout)?.pack(source)
}

pub fn unpack(layout: &Layout, packed: &[u8], dest: &mut [u8]) -> Result<()> {
    PackPlan::new(layout)?.unpack(packed, dest)
}
