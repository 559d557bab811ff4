//! Layout descriptors for transfer benchmarks.
//!
//! A [`Layout`] is an immutable tree built from a handful of combinators
//! (contiguous, strided vector, indexed blocks, struct, resized). The
//! [`registry`] maps layout names to constructors that read their
//! parameters from a [`Params`] store, and [`resolve`] sizes the
//! budget-driven ones. The [`codec`] flattens any tree into byte segments
//! and packs/unpacks data through them.

pub mod codec;
pub mod error;
pub mod layout;
pub mod layouts;
pub mod params;
pub mod registry;
pub mod resolve;
pub mod scalar;

pub use codec::{flatten, flatten_within, PackPlan, Segment};
pub use error::{Error, Result};
pub use layout::{Block, Bounds, Layout, LayoutKind, Member};
pub use params::Params;
pub use registry::{lookup, Category, Entry};
pub use resolve::{resolve, Resolved};
pub use scalar::Scalar;

/// Builds the registered layout `name` from `params`.
pub fn build_layout(name: &str, params: &Params) -> Result<Layout> {
    registry::build_layout(name, params)
}

/// Builds `name` sized to `target_bytes`; see [`resolve`].
pub fn build_size_driven_layout(
    name: &str,
    params: &Params,
    target_bytes: u64,
) -> Result<(Layout, u32)> {
    let resolved = resolve(name, params, target_bytes)?;
    Ok((resolved.layout, resolved.usable_count))
}

pub fn size(layout: &Layout) -> u64 {
    layout.size()
}

pub fn extent(layout: &Layout) -> i64 {
    layout.extent()
}

pub fn pack(layout: &Layout, source: &[u8]) -> Result<Vec<u8>> {
    codec::pack(layout, source)
}

pub fn unpack(layout: &Layout, packed: &[u8], dest: &mut [u8]) -> Result<()> {
    codec::unpack(layout, packed, dest)
}
