//! Layouts whose repetition counts are derived from an element budget `n`.

use super::fixed::{alternating_indexed_fixed, tile};
use super::{ensure, positive, product, repetitions, small, sum, Base};
use crate::error::{Error, Result};
use crate::layout::{Block, Layout, Member};
use crate::params::Params;
use crate::registry::{self, Category};

fn budget(p: &Params) -> Result<i64> {
    let n = p.int("n")?;
    ensure(n > 0, "n", "element budget must be positive")?;
    Ok(n)
}

/// As many copies of a fixed `subtype` layout as fit into `n` elements.
pub fn contig_type(p: &Params) -> Result<Layout> {
    let n = budget(p)?;
    let base = Base::from_params(p)?;
    let name = p.require("subtype")?;

    let entry = registry::lookup(name)?;
    if entry.category != Category::Fixed {
        return Err(Error::config(
            "subtype",
            format!("\"{}\" is not a fixed layout", name),
        ));
    }

    let sub = entry.build(p)?;
    let budget_bytes = product("n", &[n, base.size])?;
    let count = repetitions("n", budget_bytes, sub.size() as i64)?;

    Layout::contiguous(count, sub)
}

// The two-block unit shared by the repeated and struct forms.
fn alternating_unit(p: &Params) -> Result<(u32, u32, u32, i64, Base)> {
    let a1 = positive(p, "A1")?;
    let a2 = positive(p, "A2")?;
    let b = p.count("B")?;
    let n = budget(p)?;
    let base = Base::from_params(p)?;

    ensure(b >= a1 && b >= a2, "B", "stride must not be smaller than A1 and A2")?;
    ensure(
        n > a1 as i64 + a2 as i64,
        "n",
        "budget must exceed one A1 + A2 unit",
    )?;

    Ok((a1, a2, b, n, base))
}

/// `n / (A1 + A2)` alternating units, extent `(B + A2)` elements each.
pub fn alternating_repeated(p: &Params) -> Result<Layout> {
    let (a1, a2, b, n, base) = alternating_unit(p)?;

    let blocks = vec![Block::new(a1, 0), Block::new(a2, b as i64)];
    let unit = Layout::indexed(blocks, base.layout())?;
    let count = repetitions("n", n, a1 as i64 + a2 as i64)?;

    Layout::contiguous(count, unit)
}

/// The same data as [`alternating_repeated`], described as a struct of a
/// leading `A1` run, a vector of merged `A2 + A1` runs and a trailing `A2`
/// run. The lower bound moves to `-A2` elements.
pub fn alternating_struct(p: &Params) -> Result<Layout> {
    let (a1, a2, b, n, base) = alternating_unit(p)?;
    let e = base.size;
    let k = n / (a1 as i64 + a2 as i64);
    let period = b as i64 + a2 as i64;

    let mut members = vec![Member::new(a1, 0, base.layout())];
    if k > 1 {
        let run = small("A2", a1 as i64 + a2 as i64)?;
        let middle = Layout::vector(small("n", k - 1)?, run, period, base.layout())?;
        members.push(Member::new(1, product("B", &[b as i64, e])?, middle));
    }
    let last = sum("n", &[product("n", &[k - 1, period])?, b as i64])?;
    members.push(Member::new(a2, product("n", &[last, e])?, base.layout()));

    let s = Layout::structure(members)?;
    let extent = s.extent();
    Layout::resized(s, -(a2 as i64) * e, extent)
}

/// `n / A` tiles described as one strided vector.
pub fn tiled_vector(p: &Params) -> Result<Layout> {
    let a = positive(p, "A")?;
    let b = p.count("B")?;
    let n = budget(p)?;
    let base = Base::from_params(p)?;

    ensure(a <= b, "A", "block length must not exceed stride B")?;

    let count = repetitions("n", n, a as i64)?;
    let v = Layout::vector(count, a, b as i64, base.layout())?;
    let extent = product("n", &[count as i64, b as i64, base.size])?;

    Layout::resized(v, 0, extent)
}

/// Tiles grouped `S` at a time: an outer repetition of an inner vector of
/// `S` tiles, one group every `S * B` elements. The last group keeps its
/// natural span of `(S - 1) * B + A` elements, so the extent is
/// `((k - 1) * S * B + (S - 1) * B + A)` elements for `k` groups.
pub fn vector_tiled(p: &Params) -> Result<Layout> {
    let a = positive(p, "A")?;
    let b = p.count("B")?;
    let s = p.count("S")?;
    let n = budget(p)?;
    let base = Base::from_params(p)?;

    ensure(b > a, "B", "stride must be larger than A")?;
    ensure(s > 1, "S", "a group holds at least 2 tiles")?;

    let step = product("S", &[s as i64, b as i64, base.size])?;
    let group = Layout::vector(s, a, b as i64, base.layout())?;
    let natural = group.extent();
    let count = repetitions("n", n, s as i64 * a as i64)?;

    let run = Layout::contiguous(count, Layout::resized(group, 0, step)?)?;
    let extent = sum("n", &[product("n", &[count as i64 - 1, step])?, natural])?;

    Layout::resized(run, 0, extent)
}

/// `n / A` blocks of `A` elements whose starts advance by `B1` and `B2`
/// alternately.
pub fn block_indexed(p: &Params) -> Result<Layout> {
    let a = positive(p, "A")?;
    let b1 = p.count("B1")? as i64;
    let b2 = p.count("B2")? as i64;
    let n = budget(p)?;
    let base = Base::from_params(p)?;

    ensure(b1 >= a as i64, "B1", "must not be smaller than A")?;
    ensure(b2 >= a as i64, "B2", "must not be smaller than A")?;

    let count = repetitions("n", n, a as i64)?;
    let mut offsets = Vec::with_capacity(count as usize);
    let mut offset = 0i64;
    for i in 0..count {
        if i > 0 {
            offset = sum("n", &[offset, if i % 2 == 1 { b1 } else { b2 }])?;
        }
        offsets.push(offset);
    }

    Layout::indexed_block(a, &offsets, base.layout())
}

/// Blocks of `A1` and `A2` elements in turn, each advancing by `B1` after an
/// `A1` block and `B2` after an `A2` block. Placement stops before a block
/// would push the element total past `n`; the first block is always placed.
pub fn alternating_indexed(p: &Params) -> Result<Layout> {
    let a1 = positive(p, "A1")?;
    let a2 = positive(p, "A2")?;
    let b1 = p.count("B1")? as i64;
    let b2 = p.count("B2")? as i64;
    let n = budget(p)?;
    let base = Base::from_params(p)?;

    ensure(b1 >= a1 as i64, "B1", "must not be smaller than A1")?;
    ensure(b2 >= a2 as i64, "B2", "must not be smaller than A2")?;

    let mut blocks = vec![Block::new(a1, 0)];
    let mut placed = a1 as i64;
    let mut offset = 0i64;

    while placed < n {
        let (len, step) = if blocks.len() % 2 == 1 { (a2, b1) } else { (a1, b2) };
        if placed + len as i64 > n {
            break;
        }
        offset = sum("n", &[offset, step])?;
        blocks.push(Block::new(len, offset));
        placed += len as i64;
    }

    Layout::indexed(blocks, base.layout())
}

fn rowcol_args(p: &Params) -> Result<(i64, i64, Base)> {
    let a = positive(p, "A")? as i64;
    let n = budget(p)?;
    let base = Base::from_params(p)?;

    ensure(n >= a, "n", "budget must hold at least one row of A elements")?;

    Ok((a, n, base))
}

/// A row of `A` elements followed by a column of the remaining `n - A`
/// elements at stride `A`, all as single-element blocks.
pub fn rowcol_full_indexed(p: &Params) -> Result<Layout> {
    let (a, n, base) = rowcol_args(p)?;

    let offsets = (0..n)
        .map(|i| if i < a { Ok(i) } else { product("n", &[i - a + 1, a]) })
        .collect::<Result<Vec<i64>>>()?;

    Layout::indexed_block(1, &offsets, base.layout())
}

/// The row/column layout with the row as one contiguous block.
pub fn rowcol_contiguous_and_indexed(p: &Params) -> Result<Layout> {
    let (a, n, base) = rowcol_args(p)?;

    let mut blocks = Vec::with_capacity((n - a + 1) as usize);
    blocks.push(Block::new(small("A", a)?, 0));
    for i in 1..=n - a {
        blocks.push(Block::new(1, product("n", &[i, a])?));
    }

    Layout::indexed(blocks, base.layout())
}

/// The row/column layout as a struct of the row and a strided column.
pub fn rowcol_struct(p: &Params) -> Result<Layout> {
    let (a, n, base) = rowcol_args(p)?;

    let mut members = vec![Member::new(small("A", a)?, 0, base.layout())];
    if n > a {
        let column = Layout::vector(small("n", n - a)?, 1, a, base.layout())?;
        members.push(Member::new(1, product("A", &[a, base.size])?, column));
    }

    Layout::structure(members)
}

/// A vector with larger blocks: `A * (l / A)` elements per block at stride
/// `B * (l / A)`.
pub fn blocks(p: &Params) -> Result<Layout> {
    let a = positive(p, "A")? as i64;
    let b = p.count("B")? as i64;
    let l = p.count("l")? as i64;
    let n = budget(p)?;
    let base = Base::from_params(p)?;

    ensure(b > a, "B", "stride must be larger than A")?;
    ensure(l >= a, "l", "must not be smaller than A")?;

    let q = l / a;
    let count = repetitions("n", n, a * q)?;

    Layout::vector(count, small("l", a * q)?, product("l", &[b, q])?, base.layout())
}

/// A tiled layout rewritten as a struct: the first `A - A/2` elements, an
/// indexed middle holding everything else, and the last `A - A/2` elements.
///
/// ```text
/// xxxx__xxxx__ ... __xxxx
/// xx + indexed(xx__xxxx__ ... __xx) + xx
/// ```
pub fn tiled_struct_indexed_all(p: &Params) -> Result<Layout> {
    let a = p.count("A")? as i64;
    let b = p.count("B")? as i64;
    let n = budget(p)?;
    let base = Base::from_params(p)?;

    ensure(a >= 2, "A", "must be at least 2")?;
    ensure(b >= a, "B", "must not be smaller than A")?;
    ensure(n > a, "n", "budget must exceed A")?;

    let outer = a - a / 2;
    let half = a - outer;
    let middle_total = n - 2 * outer;

    let mut blocks = vec![Block::new(small("A", half)?, 0)];
    let mut placed = half;
    let mut offset = 0i64;

    // the first full block sits B - outer after the leading half block
    while placed < middle_total - half {
        offset = sum("n", &[offset, if blocks.len() == 1 { b - outer } else { b }])?;
        blocks.push(Block::new(small("A", a)?, offset));
        placed += a;
    }

    offset = sum("n", &[offset, if blocks.len() > 1 { b } else { b - outer }])?;
    blocks.push(Block::new(small("A", half)?, offset));
    placed += half;

    if placed > middle_total {
        blocks.pop();
    }

    let middle_len = blocks
        .last()
        .map(|last| sum("n", &[last.offset, last.len as i64]))
        .transpose()?
        .unwrap_or(0);
    let middle_extent = product("n", &[middle_len, base.size])?;
    let middle = Layout::resized(Layout::indexed(blocks, base.layout())?, 0, middle_extent)?;

    let outer_len = small("A", outer)?;
    let head = outer * base.size;
    Layout::structure(vec![
        Member::new(outer_len, 0, base.layout()),
        Member::new(1, head, middle),
        Member::new(outer_len, sum("n", &[head, middle_extent])?, base.layout()),
    ])
}

/// `n / size(unit)` copies of an alternating-indexed-fixed unit, with the
/// lower bound moved to `-A2` elements so that the inner blocks start on
/// multiples of `B`.
pub fn contig_alternating_indexed_fixed(p: &Params) -> Result<Layout> {
    let n = budget(p)?;
    let a2 = positive(p, "A2")? as i64;
    let base = Base::from_params(p)?;

    let unit = alternating_indexed_fixed(p)?;
    let count = repetitions("n", product("n", &[n, base.size])?, unit.size() as i64)?;
    let run = Layout::contiguous(count, unit)?;
    let extent = run.extent();

    Layout::resized(run, -a2 * base.size, extent)
}

/// A tiled layout with groups of `S` tiles, rewritten as a struct of four
/// parts with `k = n / (A * S)`:
///
/// ```text
/// x + (k - 1) * indexed(xx___xxx___ ... ___x) + xx___ + (S - 1) * (xxx__)
/// ```
pub fn tiled_struct_indexed_sblocks(p: &Params) -> Result<Layout> {
    let a = p.count("A")?;
    let b = p.count("B")?;
    let s = positive(p, "S")?;
    let n = budget(p)?;
    let base = Base::from_params(p)?;
    let e = base.size;

    ensure(a >= 2, "A", "must be at least 2")?;
    ensure(b >= a, "B", "must not be smaller than A")?;
    ensure(n >= a as i64 * s as i64, "n", "budget must hold S tiles")?;

    let (a_, b_, s_) = (a as i64, b as i64, s as i64);
    let k = n / (a_ * s_);

    let mut blocks = Vec::with_capacity(s as usize + 1);
    blocks.push(Block::new(a - 1, 0));
    for i in 1..s_ {
        blocks.push(Block::new(a, product("S", &[i, b_])? - 1));
    }
    blocks.push(Block::new(1, product("S", &[s_, b_])? - 1));
    let group = Layout::indexed(blocks, base.layout())?;

    let tail = product("n", &[b_, s_, k - 1])?;
    let mut members = vec![Member::new(1, 0, base.layout())];
    if k > 1 {
        members.push(Member::new(small("n", k - 1)?, e, group));
    }
    members.push(Member::new(a - 1, product("n", &[sum("n", &[tail, 1])?, e])?, base.layout()));
    if s > 1 {
        let offset = product("n", &[sum("n", &[tail, b_])?, e])?;
        members.push(Member::new(s - 1, offset, tile(a, b, base)?));
    }

    let extent = product("n", &[n / a_, b_, e])?;
    Layout::resized(Layout::structure(members)?, 0, extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{flatten, Segment};

    fn params(entries: &[(&str, &str)]) -> Params {
        entries.iter().copied().collect()
    }

    #[test]
    fn alternating_struct_matches_repeated_data() {
        let p = params(&[
            ("n", "20"),
            ("A1", "2"),
            ("A2", "3"),
            ("B", "4"),
            ("b", "byte"),
        ]);

        let repeated = alternating_repeated(&p).unwrap();
        let structured = alternating_struct(&p).unwrap();

        assert_eq!(repeated.size(), 20);
        assert_eq!(structured.size(), 20);
        assert_eq!(repeated.extent(), 4 * 7);
        assert_eq!(structured.extent(), 4 * 7);
        assert_eq!(structured.lower_bound(), -3);
        assert_eq!(flatten(&repeated), flatten(&structured));
    }

    #[test]
    fn alternating_indexed_drops_overflowing_block() {
        let p = params(&[
            ("n", "10"),
            ("A1", "3"),
            ("A2", "2"),
            ("B1", "4"),
            ("B2", "3"),
            ("b", "byte"),
        ]);

        // 3 + 2 + 3 + 2 fills the budget exactly
        let l = alternating_indexed(&p).unwrap();
        assert_eq!(l.size(), 10);
        assert_eq!(
            flatten(&l),
            vec![
                Segment::new(0, 3),
                Segment::new(4, 2),
                Segment::new(7, 3),
                Segment::new(11, 2)
            ]
        );

        // the next A1 block would overflow 12
        let p = p.with("n", 12);
        assert_eq!(alternating_indexed(&p).unwrap().size(), 10);
    }

    #[test]
    fn alternating_indexed_keeps_first_block_when_budget_is_tiny() {
        let p = params(&[
            ("n", "1"),
            ("A1", "3"),
            ("A2", "2"),
            ("B1", "4"),
            ("B2", "3"),
            ("b", "byte"),
        ]);

        assert_eq!(alternating_indexed(&p).unwrap().size(), 3);
    }

    #[test]
    fn vector_tiled_last_group_keeps_its_natural_span() {
        let p = params(&[
            ("n", "16"),
            ("A", "2"),
            ("B", "5"),
            ("S", "2"),
            ("b", "byte"),
        ]);

        // 4 groups every 10 bytes, the last one spans 5 + 2
        let l = vector_tiled(&p).unwrap();
        assert_eq!(l.size(), 16);
        assert_eq!(l.extent(), 3 * 10 + 7);
        assert_eq!(l.lower_bound(), 0);

        let expected: Vec<Segment> = (0..8).map(|i| Segment::new(i * 5, 2)).collect();
        assert_eq!(flatten(&l), expected);
    }

    #[test]
    fn oversized_parameters_are_rejected_not_wrapped() {
        let p = params(&[
            ("n", "8"),
            ("A", "1"),
            ("B", "4000000000"),
            ("S", "4000000000"),
            ("b", "double"),
        ]);
        assert_eq!(
            vector_tiled(&p).unwrap_err(),
            Error::precondition("S", "byte span overflows 64 bits")
        );

        let p = params(&[
            ("n", "9000000000000000000"),
            ("b", "double"),
            ("subtype", "tiled"),
            ("A", "1"),
            ("B", "2"),
        ]);
        assert_eq!(
            contig_type(&p).unwrap_err(),
            Error::precondition("n", "byte span overflows 64 bits")
        );
    }

    #[test]
    fn block_indexed_offsets_alternate() {
        let p = params(&[
            ("n", "8"),
            ("A", "2"),
            ("B1", "3"),
            ("B2", "5"),
            ("b", "byte"),
        ]);

        assert_eq!(
            flatten(&block_indexed(&p).unwrap()),
            vec![
                Segment::new(0, 2),
                Segment::new(3, 2),
                Segment::new(8, 2),
                Segment::new(11, 2)
            ]
        );
    }

    #[test]
    fn rowcol_variants_agree() {
        let p = params(&[("n", "7"), ("A", "3"), ("b", "byte")]);

        let full = rowcol_full_indexed(&p).unwrap();
        let mixed = rowcol_contiguous_and_indexed(&p).unwrap();
        let structured = rowcol_struct(&p).unwrap();

        let expected = vec![
            Segment::new(0, 4),
            Segment::new(6, 1),
            Segment::new(9, 1),
            Segment::new(12, 1),
        ];
        assert_eq!(flatten(&full), expected);
        assert_eq!(flatten(&mixed), expected);
        assert_eq!(flatten(&structured), expected);
        assert_eq!(full.size(), 7);
    }

    #[test]
    fn rowcol_with_row_only() {
        let p = params(&[("n", "3"), ("A", "3"), ("b", "int")]);

        assert_eq!(rowcol_struct(&p).unwrap().size(), 12);
        assert_eq!(rowcol_contiguous_and_indexed(&p).unwrap().extent(), 12);
        assert_eq!(rowcol_full_indexed(&p).unwrap().extent(), 12);
    }

    #[test]
    fn tiled_struct_indexed_all_reproduces_tiles() {
        let p = params(&[("n", "20"), ("A", "4"), ("B", "6"), ("b", "int")]);

        let l = tiled_struct_indexed_all(&p).unwrap();
        assert_eq!(l.size(), 80);

        let expected: Vec<Segment> = (0..5).map(|i| Segment::new(i * 24, 16)).collect();
        assert_eq!(flatten(&l), expected);
        assert_eq!(flatten(&tiled_vector(&p).unwrap()), expected);
    }

    #[test]
    fn sblocks_reproduce_tiles() {
        let p = params(&[
            ("n", "24"),
            ("A", "3"),
            ("B", "5"),
            ("S", "2"),
            ("b", "int"),
        ]);

        let l = tiled_struct_indexed_sblocks(&p).unwrap();
        assert_eq!(l.size(), 96);
        assert_eq!(l.extent(), 160);

        let expected: Vec<Segment> = (0..8).map(|i| Segment::new(i * 20, 12)).collect();
        assert_eq!(flatten(&l), expected);
    }

    #[test]
    fn contig_type_rejects_size_driven_subtype() {
        let p = params(&[
            ("n", "100"),
            ("b", "int"),
            ("subtype", "tiled_vector"),
            ("A", "2"),
            ("B", "3"),
        ]);

        assert!(contig_type(&p).unwrap_err().is_config());
    }

    #[test]
    fn blocks_scale_with_l() {
        let p = params(&[
            ("n", "40"),
            ("A", "2"),
            ("B", "3"),
            ("l", "5"),
            ("b", "byte"),
        ]);

        // q = 2: blocks of 4 at stride 6, 10 of them
        let l = blocks(&p).unwrap();
        assert_eq!(l.size(), 40);
        assert_eq!(flatten(&l)[1], Segment::new(6, 4));
    }
}
