use crate::error::{Error, Result};
use crate::scalar::Scalar;
use std::fmt;

/// One block of an indexed layout: `len` copies of the inner layout starting
/// `offset` inner extents away from the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    pub len: u32,
    pub offset: i64,
}

impl Block {
    pub fn new(len: u32, offset: i64) -> Block {
        Block { len, offset }
    }
}

/// One member of a struct layout. `count` copies of `layout` are placed back
/// to back starting at `offset` bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub count: u32,
    pub offset: i64,
    pub layout: Layout,
}

impl Member {
    pub fn new(count: u32, offset: i64, layout: Layout) -> Member {
        Member {
            count,
            offset,
            layout,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutKind {
    Primitive(Scalar),
    Contiguous {
        count: u32,
        inner: Box<Layout>,
    },
    Strided {
        count: u32,
        block_len: u32,
        stride: i64,
        inner: Box<Layout>,
    },
    Indexed {
        blocks: Vec<Block>,
        inner: Box<Layout>,
    },
    Struct {
        members: Vec<Member>,
    },
    Resized {
        lower_bound: i64,
        extent: i64,
        inner: Box<Layout>,
    },
}

/// Byte range `[lower, upper)` relative to a layout's origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub lower: i64,
    pub upper: i64,
}

impl Bounds {
    pub fn extent(&self) -> i64 {
        self.upper - self.lower
    }

    fn union(self, other: Bounds) -> Bounds {
        Bounds {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    // Bounds of copies of `self` placed at byte positions `first..=last`.
    fn spread(self, first: i64, last: i64) -> Option<Bounds> {
        Some(Bounds {
            lower: first.checked_add(self.lower)?,
            upper: last.checked_add(self.upper)?,
        })
    }
}

/// An immutable layout tree. The only way to get one is through the
/// validating combinators below, so every `Layout` has positive counts,
/// positive block lengths, at least one block or member, a non-negative
/// resized extent, and a size and bounds that fit in 64 bits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    kind: LayoutKind,
    size: u64,
    bounds: Bounds,
    true_bounds: Bounds,
}

impl Layout {
    pub fn primitive(scalar: Scalar) -> Layout {
        let bounds = Bounds {
            lower: 0,
            upper: scalar.size() as i64,
        };

        Layout {
            kind: LayoutKind::Primitive(scalar),
            size: scalar.size() as u64,
            bounds,
            true_bounds: bounds,
        }
    }

    /// `count` copies of `inner` placed back to back.
    pub fn contiguous(count: u32, inner: Layout) -> Result<Layout> {
        if count == 0 {
            return Err(Error::invalid_layout("contiguous count must be positive"));
        }

        Layout::measure(LayoutKind::Contiguous {
            count,
            inner: Box::new(inner),
        })
    }

    /// `count` blocks of `block_len` copies of `inner`. Block starts are
    /// `stride` inner extents apart.
    pub fn vector(count: u32, block_len: u32, stride: i64, inner: Layout) -> Result<Layout> {
        if count == 0 {
            return Err(Error::invalid_layout("vector count must be positive"));
        }
        if block_len == 0 {
            return Err(Error::invalid_layout("vector block length must be positive"));
        }

        Layout::measure(LayoutKind::Strided {
            count,
            block_len,
            stride,
            inner: Box::new(inner),
        })
    }

    pub fn indexed(blocks: Vec<Block>, inner: Layout) -> Result<Layout> {
        if blocks.is_empty() {
            return Err(Error::invalid_layout("indexed layout needs at least one block"));
        }
        if let Some(i) = blocks.iter().position(|b| b.len == 0) {
            return Err(Error::invalid_layout(format!(
                "indexed block {} has zero length",
                i
            )));
        }

        Layout::measure(LayoutKind::Indexed {
            blocks,
            inner: Box::new(inner),
        })
    }

    /// Indexed layout where every block has the same length.
    pub fn indexed_block(block_len: u32, offsets: &[i64], inner: Layout) -> Result<Layout> {
        let blocks = offsets
            .iter()
            .map(|&offset| Block::new(block_len, offset))
            .collect();
        Layout::indexed(blocks, inner)
    }

    pub fn structure(members: Vec<Member>) -> Result<Layout> {
        if members.is_empty() {
            return Err(Error::invalid_layout("struct layout needs at least one member"));
        }
        if let Some(i) = members.iter().position(|m| m.count == 0) {
            return Err(Error::invalid_layout(format!(
                "struct member {} has zero count",
                i
            )));
        }

        Layout::measure(LayoutKind::Struct { members })
    }

    /// Overrides the bounds `inner` presents to an enclosing combinator.
    pub fn resized(inner: Layout, lower_bound: i64, extent: i64) -> Result<Layout> {
        if extent < 0 {
            return Err(Error::invalid_layout(format!(
                "resized extent {} is negative",
                extent
            )));
        }

        Layout::measure(LayoutKind::Resized {
            lower_bound,
            extent,
            inner: Box::new(inner),
        })
    }

    // Children are already measured, so only this node's own arithmetic
    // can overflow.
    fn measure(kind: LayoutKind) -> Result<Layout> {
        let overflow = || Error::invalid_layout("layout size or span overflows 64 bits");

        let size = checked_size(&kind).ok_or_else(overflow)?;
        let bounds = checked_bounds(&kind, Layout::bounds).ok_or_else(overflow)?;
        let true_bounds = match &kind {
            LayoutKind::Resized { inner, .. } => inner.true_bounds,
            _ => checked_bounds(&kind, Layout::true_bounds).ok_or_else(overflow)?,
        };

        Ok(Layout {
            kind,
            size,
            bounds,
            true_bounds,
        })
    }

    pub fn kind(&self) -> &LayoutKind {
        &self.kind
    }

    /// Bytes actually covered by data.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Bounds of the bytes covered by data, ignoring any resized overrides.
    pub fn true_bounds(&self) -> Bounds {
        self.true_bounds
    }

    pub fn extent(&self) -> i64 {
        self.bounds.extent()
    }

    pub fn lower_bound(&self) -> i64 {
        self.bounds.lower
    }

    pub fn upper_bound(&self) -> i64 {
        self.bounds.upper
    }

    pub fn true_lower_bound(&self) -> i64 {
        self.true_bounds.lower
    }

    pub fn true_extent(&self) -> i64 {
        self.true_bounds.extent()
    }

    /// Number of primitive elements in the layout. Never more than `size`.
    pub fn element_count(&self) -> u64 {
        match &self.kind {
            LayoutKind::Primitive(_) => 1,
            LayoutKind::Contiguous { count, inner } => *count as u64 * inner.element_count(),
            LayoutKind::Strided {
                count,
                block_len,
                inner,
                ..
            } => *count as u64 * *block_len as u64 * inner.element_count(),
            LayoutKind::Indexed { blocks, inner } => {
                blocks.iter().map(|b| b.len as u64).sum::<u64>() * inner.element_count()
            }
            LayoutKind::Struct { members } => members
                .iter()
                .map(|m| m.count as u64 * m.layout.element_count())
                .sum(),
            LayoutKind::Resized { inner, .. } => inner.element_count(),
        }
    }

    pub fn depth(&self) -> usize {
        match &self.kind {
            LayoutKind::Primitive(_) => 1,
            LayoutKind::Contiguous { inner, .. }
            | LayoutKind::Strided { inner, .. }
            | LayoutKind::Indexed { inner, .. }
            | LayoutKind::Resized { inner, .. } => 1 + inner.depth(),
            LayoutKind::Struct { members } => {
                1 + members.iter().map(|m| m.layout.depth()).max().unwrap_or(0)
            }
        }
    }
}

fn checked_size(kind: &LayoutKind) -> Option<u64> {
    match kind {
        LayoutKind::Primitive(scalar) => Some(scalar.size() as u64),
        LayoutKind::Contiguous { count, inner } => inner.size.checked_mul(*count as u64),
        LayoutKind::Strided {
            count,
            block_len,
            inner,
            ..
        } => inner
            .size
            .checked_mul(*count as u64)?
            .checked_mul(*block_len as u64),
        LayoutKind::Indexed { blocks, inner } => blocks
            .iter()
            .try_fold(0u64, |acc, b| acc.checked_add(b.len as u64))?
            .checked_mul(inner.size),
        LayoutKind::Struct { members } => members.iter().try_fold(0u64, |acc, m| {
            acc.checked_add(m.layout.size.checked_mul(m.count as u64)?)
        }),
        LayoutKind::Resized { inner, .. } => Some(inner.size),
    }
}

// Shared by `bounds` and `true_bounds`. Replication always steps by the
// child's extent; only the bounds taken from the child differ.
fn checked_bounds(kind: &LayoutKind, child_bounds: fn(&Layout) -> Bounds) -> Option<Bounds> {
    let bounds = match kind {
        LayoutKind::Primitive(scalar) => Bounds {
            lower: 0,
            upper: scalar.size() as i64,
        },
        LayoutKind::Contiguous { count, inner } => {
            let last = (*count as i64 - 1).checked_mul(inner.extent())?;
            child_bounds(inner).spread(0, last)?
        }
        LayoutKind::Strided {
            count,
            block_len,
            stride,
            inner,
        } => {
            let ext = inner.extent();
            let last_start = (*count as i64 - 1).checked_mul(*stride)?;
            let first = last_start.min(0);
            let last = last_start.max(0).checked_add(*block_len as i64 - 1)?;
            child_bounds(inner).spread(first.checked_mul(ext)?, last.checked_mul(ext)?)?
        }
        LayoutKind::Indexed { blocks, inner } => {
            let ext = inner.extent();
            let first = blocks.iter().map(|b| b.offset).min()?;
            let last = blocks.iter().try_fold(i64::MIN, |acc, b| {
                Some(acc.max(b.offset.checked_add(b.len as i64 - 1)?))
            })?;
            child_bounds(inner).spread(first.checked_mul(ext)?, last.checked_mul(ext)?)?
        }
        LayoutKind::Struct { members } => members
            .iter()
            .map(|m| {
                let last = (m.count as i64 - 1)
                    .checked_mul(m.layout.extent())?
                    .checked_add(m.offset)?;
                child_bounds(&m.layout).spread(m.offset, last)
            })
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .reduce(Bounds::union)?,
        LayoutKind::Resized {
            lower_bound,
            extent,
            ..
        } => Bounds {
            lower: *lower_bound,
            upper: lower_bound.checked_add(*extent)?,
        },
    };

    // the extent itself must be representable too
    bounds.upper.checked_sub(bounds.lower)?;
    Some(bounds)
}

/// Renders the tree as an s-expression, e.g. `(resized 0 40 (indexed [2@0 3@5] int))`.
impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LayoutKind::Primitive(scalar) => write!(f, "{}", scalar),
            LayoutKind::Contiguous { count, inner } => write!(f, "(contig {} {})", count, inner),
            LayoutKind::Strided {
                count,
                block_len,
                stride,
                inner,
            } => write!(f, "(vector {} {} {} {})", count, block_len, stride, inner),
            LayoutKind::Indexed { blocks, inner } => {
                write!(f, "(indexed [")?;
                for (i, b) in blocks.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}@{}", b.len, b.offset)?;
                }
                write!(f, "] {})", inner)
            }
            LayoutKind::Struct { members } => {
                write!(f, "(struct")?;
                for m in members {
                    write!(f, " ({} {} {})", m.count, m.offset, m.layout)?;
                }
                write!(f, ")")
            }
            LayoutKind::Resized {
                lower_bound,
                extent,
                inner,
            } => write!(f, "(resized {} {} {})", lower_bound, extent, inner),
        }
    }
}
