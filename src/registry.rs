use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::layouts::{fixed, sized};
use crate::params::Params;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Parameters alone determine the layout.
    Fixed,
    /// An element budget `n` also determines internal repetition counts.
    SizeDriven,
}

pub type Builder = fn(&Params) -> Result<Layout>;

#[derive(Debug)]
pub struct Entry {
    pub name: &'static str,
    pub category: Category,
    /// Keys the builder needs, in the order they are documented.
    pub params: &'static [&'static str],
    builder: Builder,
}

impl Entry {
    /// Checks the schema, then runs the builder.
    pub fn build(&self, params: &Params) -> Result<Layout> {
        if let Some(key) = self.params.iter().find(|key| !params.contains(key)) {
            return Err(Error::missing(*key));
        }

        let layout = (self.builder)(params)?;

        debug!(
            layout = self.name,
            size = layout.size(),
            extent = layout.extent(),
            "built layout"
        );

        Ok(layout)
    }
}

const fn entry(
    name: &'static str,
    category: Category,
    params: &'static [&'static str],
    builder: Builder,
) -> Entry {
    Entry {
        name,
        category,
        params,
        builder,
    }
}

use Category::{Fixed, SizeDriven};

static ENTRIES: &[Entry] = &[
    entry("tiled", Fixed, &["A", "B", "b"], fixed::tiled),
    entry("bucket", Fixed, &["A1", "A2", "B", "b"], fixed::bucket),
    entry("block", Fixed, &["A", "B1", "B2", "b"], fixed::block),
    entry("alternating", Fixed, &["A1", "A2", "B1", "B2", "b"], fixed::alternating),
    entry("tiled_heterogeneous", Fixed, &["A", "B", "c", "blist"], fixed::tiled_heterogeneous),
    entry("tiled_struct", Fixed, &["A", "B", "S1", "S2", "b"], fixed::tiled_struct),
    entry("contig_type", SizeDriven, &["n", "b", "subtype"], sized::contig_type),
    entry("alternating_repeated", SizeDriven, &["n", "A1", "A2", "B", "b"], sized::alternating_repeated),
    entry("alternating_struct", SizeDriven, &["n", "A1", "A2", "B", "b"], sized::alternating_struct),
    entry("tiled_vector", SizeDriven, &["n", "A", "B", "b"], sized::tiled_vector),
    entry("vector_tiled", SizeDriven, &["n", "A", "B", "S", "b"], sized::vector_tiled),
    entry("block_indexed", SizeDriven, &["n", "A", "B1", "B2", "b"], sized::block_indexed),
    entry("alternating_indexed", SizeDriven, &["n", "A1", "A2", "B1", "B2", "b"], sized::alternating_indexed),
    entry("rowcol_full_indexed", SizeDriven, &["n", "A", "b"], sized::rowcol_full_indexed),
    entry("rowcol_contiguous_and_indexed", SizeDriven, &["n", "A", "b"], sized::rowcol_contiguous_and_indexed),
    entry("rowcol_struct", SizeDriven, &["n", "A", "b"], sized::rowcol_struct),
    entry("blocks", SizeDriven, &["n", "A", "B", "l", "b"], sized::blocks),
    entry("tiled_struct_indexed_all", SizeDriven, &["n", "A", "B", "b"], sized::tiled_struct_indexed_all),
    entry("alternating_indexed_fixed", Fixed, &["A1", "A2", "B", "S", "b"], fixed::alternating_indexed_fixed),
    entry("contig_alternating_indexed_fixed", SizeDriven, &["n", "A1", "A2", "B", "S", "b"], sized::contig_alternating_indexed_fixed),
    entry("alternating_aligned", Fixed, &["A1", "A2", "B1", "B2", "b"], fixed::alternating_aligned),
    entry("tiled_struct_indexed_Sblocks", SizeDriven, &["n", "A", "B", "S", "b"], sized::tiled_struct_indexed_sblocks),
    entry("basetype", Fixed, &["b"], fixed::basetype),
];

/// All registered layouts, in registration order.
pub fn entries() -> &'static [Entry] {
    ENTRIES
}

/// Exact, case-sensitive lookup.
pub fn lookup(name: &str) -> Result<&'static Entry> {
    ENTRIES
        .iter()
        .find(|e| e.name == name)
        .ok_or_else(|| Error::unknown_layout(name))
}

pub fn build_layout(name: &str, params: &Params) -> Result<Layout> {
    lookup(name)?.build(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = entries().iter().map(|e| e.name).collect();
        assert_eq!(names.len(), entries().len());
        assert_eq!(entries().len(), 23);
    }

    #[test]
    fn size_driven_entries_take_a_budget() {
        for e in entries() {
            let takes_budget = e.params.contains(&"n");
            assert_eq!(takes_budget, e.category == Category::SizeDriven, "{}", e.name);
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(lookup("tiled").is_ok());
        assert_eq!(
            lookup("Tiled").unwrap_err(),
            Error::unknown_layout("Tiled")
        );
    }

    #[test]
    fn missing_schema_key_is_reported_first() {
        let p = Params::new().with("A", 2).with("b", "int");
        assert_eq!(build_layout("tiled", &p).unwrap_err(), Error::missing("B"));
    }
}
