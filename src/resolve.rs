use crate::error::Result;
use crate::layout::Layout;
use crate::params::Params;
use crate::registry;
use tracing::{debug, warn};

/// A layout built to fit a byte budget.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub layout: Layout,
    /// Elements of the base type the budget holds (`n`).
    pub requested_elements: u64,
    /// Instances of `layout` the caller should transfer: 1 if the layout fits
    /// the budget, 0 if it overflows and the configuration should be skipped.
    pub usable_count: u32,
}

impl Resolved {
    pub fn fits(&self) -> bool {
        self.usable_count > 0
    }
}

/// Builds `name` for a budget of `target_bytes`.
///
/// The constructor only sees a private parameter set: `n`, `b`, the keys of
/// the entry's schema and, for `contig_type`, the subtype and its schema.
pub fn resolve(name: &str, params: &Params, target_bytes: u64) -> Result<Resolved> {
    let entry = registry::lookup(name)?;
    let elem_size = params.scalar("b")?.size() as u64;
    let n = target_bytes / elem_size;

    let mut private = Params::new();
    private.insert("n", n.to_string());
    private.copy_entry("b", params);
    for key in entry.params {
        if *key != "n" {
            private.copy_entry(key, params);
        }
    }

    if entry.name == "contig_type" {
        let subtype = params.require("subtype")?;
        for key in registry::lookup(subtype)?.params {
            private.copy_entry(key, params);
        }
    }

    let layout = entry.build(&private)?;
    let size = layout.size();

    let usable_count = if size > target_bytes {
        warn!(
            layout = name,
            size,
            budget = target_bytes,
            "layout is larger than the byte budget, skipping"
        );
        0
    } else {
        1
    };

    debug!(layout = name, n, size, usable_count, "resolved layout");

    Ok(Resolved {
        layout,
        requested_elements: n,
        usable_count,
    })
}
