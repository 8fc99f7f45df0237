use std::env;
use std::fs;
use std::io;

use anyhow::Context as _;
use anyhow::Result;
use decoupe::{metrics, Hypergraph};

fn main() -> Result<()> {
    let mut options = getopts::Options::new();
    options.optflag("", "help", "print this help menu");
    options.optopt("h", "hypergraph", "hypergraph file in hMetis format", "FILE");
    options.optopt("p", "partition", "partition file", "FILE");

    let matches = options.parse(env::args().skip(1))?;
    if matches.opt_present("help") {
        eprintln!("{}", options.usage("Usage: part-info -h FILE -p FILE"));
        return Ok(());
    }

    let hypergraph_file = matches
        .opt_str("hypergraph")
        .context("missing required option 'hypergraph'")?;
    let file = hgr_io::Hypergraph::from_file(&hypergraph_file)
        .with_context(|| format!("failed to read hypergraph {:?}", hypergraph_file))?;

    let partition_file = matches
        .opt_str("partition")
        .context("missing required option 'partition'")?;
    let partition_file = fs::File::open(&partition_file)
        .with_context(|| format!("failed to open partition file {:?}", partition_file))?;
    let partition = hgr_io::partition::read(io::BufReader::new(partition_file))
        .context("failed to read partition file")?;

    anyhow::ensure!(
        partition.len() == file.num_vertices,
        "partition has {} entries for {} vertices",
        partition.len(),
        file.num_vertices
    );
    let k = partition.iter().max().map_or(1, |&b| b as usize + 1);

    let mut hg = Hypergraph::new(
        k,
        file.vertex_weights.clone(),
        file.hyperedge_weights.clone(),
        &file.pin_lists,
    )?;
    hg.apply_partition(&partition);

    println!("vertices   = {}", hg.initial_num_vertices());
    println!("hyperedges = {}", hg.num_nets());
    println!("blocks     = {}", k);
    println!("cut        = {}", metrics::hyperedge_cut(&hg));
    println!("km1        = {}", metrics::km1(&hg));
    println!("imbalance  = {:.6}", metrics::imbalance(&hg));
    for b in 0..k as u32 {
        println!("block {:<4} = {}", b, hg.block_weight(b));
    }
    Ok(())
}
