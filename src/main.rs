use anyhow::{bail, Result};
use clap::{Parser as ClapParser, Subcommand};
use layoutbench::{registry, resolve, Layout, PackPlan, Params};
use std::time::Instant;
use tracing::{info, warn};

fn parse_param(s: &str) -> Result<(String, String), layoutbench::Error> {
    Params::parse_entry(s)
}

#[derive(ClapParser, Debug)]
#[command(about = "Build, inspect and pack benchmark data layouts")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every registered layout with its parameters
    List,

    /// Print size, extent and structure of one layout
    Describe {
        #[arg(short, long)]
        layout: String,

        /// Layout parameters as key:value, e.g. --params A:4 --params b:int
        #[arg(short, long = "params", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Byte budget for size-driven layouts
        #[arg(long)]
        nbytes: Option<u64>,
    },

    /// Pack and unpack a layout for every byte budget and verify the result
    Roundtrip {
        #[arg(short, long)]
        layout: String,

        #[arg(short, long = "params", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Slash-separated list of byte budgets, e.g. 1000/2000/40000
        #[arg(long, value_delimiter = '/', required = true)]
        nbytes: Vec<u64>,

        /// Instances of the layout per transfer
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn list() {
    for entry in registry::entries() {
        println!(
            "{:<36} {:<12} {}",
            entry.name,
            format!("{:?}", entry.category),
            entry.params.join(",")
        );
    }
}

fn describe(name: &str, params: &Params, nbytes: Option<u64>) -> Result<()> {
    let layout = match nbytes {
        Some(nbytes) => resolve(name, params, nbytes)?.layout,
        None => layoutbench::build_layout(name, params)?,
    };

    print_layout(name, &layout);
    Ok(())
}

fn print_layout(name: &str, layout: &Layout) {
    let segments = layoutbench::flatten(layout);

    println!("{:<12} {}", "layout", name);
    println!("{:<12} {}", "size", layout.size());
    println!("{:<12} {}", "extent", layout.extent());
    println!("{:<12} {}", "lower bound", layout.lower_bound());
    println!("{:<12} {}", "true extent", layout.true_extent());
    println!("{:<12} {}", "elements", layout.element_count());
    println!("{:<12} {}", "depth", layout.depth());
    println!("{:<12} {}", "segments", segments.len());
    println!("{:<12} {}", "tree", layout);
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) + 7) as u8).collect()
}

fn roundtrip(name: &str, params: &Params, budgets: &[u64], count: u32) -> Result<()> {
    for &nbytes in budgets {
        let resolved = resolve(name, params, nbytes)?;
        if !resolved.fits() {
            println!("{:>10} skipped", nbytes);
            continue;
        }

        let instances = count * resolved.usable_count;
        let plan = PackPlan::with_count(&resolved.layout, instances)?;
        let origin = plan.origin() as i64;
        let len = plan.buffer_len();

        let source = pattern(len);
        let mut dest = vec![0u8; len];

        let start = Instant::now();
        let packed = plan.pack(&source)?;
        plan.unpack(&packed, &mut dest)?;
        let elapsed = start.elapsed();

        let mut touched = vec![false; len];
        for s in plan.segments() {
            let range = (origin + s.offset) as usize..(origin + s.end()) as usize;
            touched[range.clone()].fill(true);
            if dest[range.clone()] != source[range] {
                bail!("round trip mismatch in segment at offset {}", s.offset);
            }
        }
        if dest.iter().zip(&touched).any(|(&b, &t)| !t && b != 0) {
            bail!("unpack wrote outside the layout");
        }

        println!(
            "{:>10} packed {:>10} bytes in {:>6} segments, {:?}",
            nbytes,
            packed.len(),
            plan.segments().len(),
            elapsed
        );
    }

    info!(layout = name, budgets = budgets.len(), "round trip verified");
    Ok(())
}

fn main() -> Result<()> {
    init_logging();

    let Args { command } = Args::try_parse()?;

    match command {
        Command::List => list(),
        Command::Describe {
            layout,
            params,
            nbytes,
        } => describe(&layout, &params.into_iter().collect::<Params>(), nbytes)?,
        Command::Roundtrip {
            layout,
            params,
            nbytes,
            count,
        } => {
            if count == 0 {
                warn!("count is zero, nothing to transfer");
                return Ok(());
            }
            roundtrip(&layout, &params.into_iter().collect::<Params>(), &nbytes, count)?
        }
    }

    Ok(())
}
