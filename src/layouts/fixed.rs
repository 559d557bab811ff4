//! Layouts whose size is fully determined by their parameters.

use super::{ensure, positive, product, sum, Base};
use crate::error::Result;
use crate::layout::{Block, Layout, Member};
use crate::params::Params;

pub fn basetype(p: &Params) -> Result<Layout> {
    Ok(Base::from_params(p)?.layout())
}

/// `A` elements, extent `B` elements.
pub fn tiled(p: &Params) -> Result<Layout> {
    let a = positive(p, "A")?;
    let b = p.count("B")?;
    let base = Base::from_params(p)?;

    // degenerate A == B is allowed
    ensure(a <= b, "A", "block length must not exceed stride B")?;

    tile(a, b, base)
}

pub(crate) fn tile(a: u32, b: u32, base: Base) -> Result<Layout> {
    let extent = product("B", &[b as i64, base.size])?;
    Layout::resized(Layout::contiguous(a, base.layout())?, 0, extent)
}

/// `A1 + A2` elements in two blocks `B` apart, extent `2B` elements.
pub fn bucket(p: &Params) -> Result<Layout> {
    let a1 = positive(p, "A1")?;
    let a2 = positive(p, "A2")?;
    let b = p.count("B")?;
    let base = Base::from_params(p)?;

    ensure(b >= a1 && b >= a2, "B", "stride must not be smaller than A1 and A2")?;

    let blocks = vec![Block::new(a1, 0), Block::new(a2, b as i64)];
    let extent = product("B", &[2, b as i64, base.size])?;
    Layout::resized(Layout::indexed(blocks, base.layout())?, 0, extent)
}

/// `2A` elements, the second block at `B1`, extent `B1 + B2` elements.
pub fn block(p: &Params) -> Result<Layout> {
    let a = positive(p, "A")?;
    let b1 = p.count("B1")?;
    let b2 = p.count("B2")?;
    let base = Base::from_params(p)?;

    ensure(b1 >= a, "B1", "must not be smaller than A")?;
    ensure(b2 >= a, "B2", "must not be smaller than A")?;

    let extent = product("B2", &[b1 as i64 + b2 as i64, base.size])?;
    Layout::resized(
        Layout::indexed_block(a, &[0, b1 as i64], base.layout())?,
        0,
        extent,
    )
}

fn alternating_pair(p: &Params) -> Result<(Layout, i64, i64)> {
    let a1 = positive(p, "A1")?;
    let a2 = positive(p, "A2")?;
    let b1 = p.count("B1")?;
    let b2 = p.count("B2")?;
    let base = Base::from_params(p)?;

    ensure(b1 >= a1, "B1", "must not be smaller than A1")?;
    ensure(b2 >= a2, "B2", "must not be smaller than A2")?;

    let blocks = vec![Block::new(a1, 0), Block::new(a2, b1 as i64)];
    let pair = Layout::indexed(blocks, base.layout())?;

    Ok((
        pair,
        product("B1", &[b1 as i64, base.size])?,
        product("B2", &[b2 as i64, base.size])?,
    ))
}

/// `A1` then `A2` elements, extents `B1` and `B2`.
pub fn alternating(p: &Params) -> Result<Layout> {
    let (pair, b1, b2) = alternating_pair(p)?;
    Layout::resized(pair, 0, sum("B2", &[b1, b2])?)
}

/// Alternating, with the lower bound moved to `-B2` so that repeated
/// instances line up on `B1 + B2` boundaries.
pub fn alternating_aligned(p: &Params) -> Result<Layout> {
    let (pair, b1, b2) = alternating_pair(p)?;
    Layout::resized(pair, -b2, sum("B2", &[b1, b2])?)
}

/// `c` members of `A` elements each, of the types listed in `blist`. Member
/// `i` starts `B` elements of type `i - 1` after member `i - 1`.
pub fn tiled_heterogeneous(p: &Params) -> Result<Layout> {
    let a = positive(p, "A")?;
    let b = p.count("B")?;
    let c = positive(p, "c")?;
    let types = p.scalar_list("blist", c as usize)?;

    ensure(a <= b, "A", "block length must not exceed stride B")?;

    let mut members = Vec::with_capacity(types.len());
    let mut offset = 0i64;
    for (i, scalar) in types.iter().enumerate() {
        if i > 0 {
            let step = product("B", &[b as i64, types[i - 1].size() as i64])?;
            offset = sum("B", &[offset, step])?;
        }
        members.push(Member::new(a, offset, Layout::primitive(*scalar)));
    }

    Layout::structure(members)
}

/// Two runs of `S1` and `S2` tiles, expressed as a struct of contiguous
/// tiles. Same data and extent as `S1 + S2` tiles.
pub fn tiled_struct(p: &Params) -> Result<Layout> {
    let s1 = positive(p, "S1")?;
    let s2 = positive(p, "S2")?;
    let b = p.count("B")?;
    let base = Base::from_params(p)?;
    let t = tiled(p)?;

    let tile_extent = product("B", &[b as i64, base.size])?;
    let members = vec![
        Member::new(1, 0, Layout::contiguous(s1, t.clone())?),
        Member::new(
            1,
            product("S1", &[s1 as i64, tile_extent])?,
            Layout::contiguous(s2, t)?,
        ),
    ];
    let extent = product("S2", &[s1 as i64 + s2 as i64, tile_extent])?;

    Layout::resized(Layout::structure(members)?, 0, extent)
}

/// `S` blocks: `A1` elements, then `S - 2` blocks of `A1 + A2`, then `A2`.
/// The second block starts at `B1 = B - A2`, every later one `B` further.
pub fn alternating_indexed_fixed(p: &Params) -> Result<Layout> {
    let a1 = positive(p, "A1")?;
    let a2 = positive(p, "A2")?;
    let b = p.count("B")? as i64;
    let s = p.count("S")?;
    let base = Base::from_params(p)?;

    ensure(b >= a1 as i64 + a2 as i64, "B", "must not be smaller than A1 + A2")?;
    ensure(s >= 2, "S", "an alternating layout has at least 2 blocks")?;

    let b1 = b - a2 as i64;

    let mut blocks = Vec::with_capacity(s as usize);
    blocks.push(Block::new(a1, 0));
    for j in 1..(s - 1) as i64 {
        blocks.push(Block::new(a1 + a2, sum("S", &[b1, product("S", &[j - 1, b])?])?));
    }
    blocks.push(Block::new(a2, sum("S", &[b1, product("S", &[s as i64 - 2, b])?])?));

    Layout::indexed(blocks, base.layout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{flatten, Segment};

    fn params(entries: &[(&str, &str)]) -> Params {
        entries.iter().copied().collect()
    }

    #[test]
    fn tiled_formula() {
        let l = tiled(&params(&[("A", "3"), ("B", "5"), ("b", "int")])).unwrap();
        assert_eq!(l.size(), 12);
        assert_eq!(l.extent(), 20);
        assert_eq!(l.lower_bound(), 0);
    }

    #[test]
    fn tiled_rejects_a_larger_than_b() {
        let err = tiled(&params(&[("A", "6"), ("B", "5"), ("b", "int")])).unwrap_err();
        assert!(err.is_config());

        let err = tiled(&params(&[("A", "0"), ("B", "5"), ("b", "int")])).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn tiled_struct_extent_overflow_is_a_config_error() {
        let err = tiled_struct(&params(&[
            ("A", "1"),
            ("B", "4000000000"),
            ("S1", "4000000000"),
            ("S2", "4000000000"),
            ("b", "double"),
        ]))
        .unwrap_err();

        assert!(err.is_config());
    }

    #[test]
    fn heterogeneous_offsets_follow_previous_type() {
        let l = tiled_heterogeneous(&params(&[
            ("A", "2"),
            ("B", "3"),
            ("c", "3"),
            ("blist", "char/double/int"),
        ]))
        .unwrap();

        // offsets 0, 3*1, 3 + 3*8
        assert_eq!(
            flatten(&l),
            vec![Segment::new(0, 2), Segment::new(3, 16), Segment::new(27, 8)]
        );
        assert_eq!(l.size(), 26);
        assert_eq!(l.extent(), 35);
    }

    #[test]
    fn heterogeneous_list_length_must_match_c() {
        let err = tiled_heterogeneous(&params(&[
            ("A", "2"),
            ("B", "3"),
            ("c", "2"),
            ("blist", "char/double/int"),
        ]))
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn alternating_indexed_fixed_blocks() {
        let l = alternating_indexed_fixed(&params(&[
            ("A1", "1"),
            ("A2", "2"),
            ("B", "5"),
            ("S", "4"),
            ("b", "byte"),
        ]))
        .unwrap();

        // B1 = 3: blocks 1@0, 3@3, 3@8, 2@13
        assert_eq!(
            flatten(&l),
            vec![
                Segment::new(0, 1),
                Segment::new(3, 3),
                Segment::new(8, 3),
                Segment::new(13, 2)
            ]
        );
        assert_eq!(l.size(), 3 * 3);
        assert_eq!(l.extent(), 3 * 5);
    }

    #[test]
    fn alternating_indexed_fixed_with_two_blocks() {
        let l = alternating_indexed_fixed(&params(&[
            ("A1", "2"),
            ("A2", "2"),
            ("B", "6"),
            ("S", "2"),
            ("b", "byte"),
        ]))
        .unwrap();

        assert_eq!(flatten(&l), vec![Segment::new(0, 2), Segment::new(4, 2)]);
        assert_eq!(l.extent(), 6);
    }
}
