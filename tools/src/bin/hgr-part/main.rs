use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use anyhow::Result;
use decoupe::{Error, Hypergraph, Mode, Objective, Partitioner};

fn usage(options: &getopts::Options) -> String {
    options.usage("Usage: hgr-part -h FILE -k BLOCKS -e EPSILON -o OBJECTIVE -m MODE [options]")
}

fn run() -> Result<bool> {
    let mut options = getopts::Options::new();
    options.optflag("", "help", "print this help menu");
    options.optopt("h", "hypergraph", "hypergraph file in hMetis format", "FILE");
    options.optopt("k", "blocks", "number of blocks", "INT");
    options.optopt("e", "epsilon", "allowed imbalance", "FLOAT");
    options.optopt("o", "objective", "cut or km1", "NAME");
    options.optopt("m", "mode", "recursive or direct", "NAME");
    decoupe_tools::register_tuning_options(&mut options);

    let matches = options.parse(env::args().skip(1))?;
    if matches.opt_present("help") {
        eprintln!("{}", usage(&options));
        return Ok(true);
    }

    let input: PathBuf = matches
        .opt_str("hypergraph")
        .context("missing required option 'hypergraph'")?
        .into();
    let k: usize = matches
        .opt_str("blocks")
        .context("missing required option 'blocks'")?
        .parse()
        .context("'blocks' is not a valid integer")?;
    let epsilon: f64 = matches
        .opt_str("epsilon")
        .context("missing required option 'epsilon'")?
        .parse()
        .context("'epsilon' is not a valid number")?;
    let objective: Objective = matches
        .opt_str("objective")
        .context("missing required option 'objective'")?
        .parse()?;
    let mode: Mode = matches
        .opt_str("mode")
        .context("missing required option 'mode'")?
        .parse()?;

    let preset = matches.opt_str("preset").map(PathBuf::from);
    let ctx = decoupe_tools::build_context(
        k,
        epsilon,
        objective,
        mode,
        preset.as_deref(),
        &matches,
    )?;

    let file = hgr_io::Hypergraph::from_file(&input)
        .with_context(|| format!("failed to read hypergraph {:?}", input))?;

    // nets above the cmaxnet threshold are dropped up front
    let (pin_lists, hyperedge_weights): (Vec<_>, Vec<_>) = match ctx.partition.max_net_size {
        Some(limit) => file
            .pin_lists
            .iter()
            .zip(&file.hyperedge_weights)
            .filter(|(pins, _)| pins.len() <= limit)
            .map(|(pins, &w)| (pins.clone(), w))
            .unzip(),
        None => (file.pin_lists.clone(), file.hyperedge_weights.clone()),
    };
    let dropped = file.pin_lists.len() - pin_lists.len();
    if dropped > 0 {
        tracing::info!(dropped, "ignored hyperedges above the cmaxnet threshold");
    }

    let mut hg = Hypergraph::new(k, file.vertex_weights.clone(), hyperedge_weights, &pin_lists)?;

    if let Some(path) = matches.opt_str("fixed") {
        let file = fs::File::open(&path)
            .with_context(|| format!("failed to open fixed-vertex file {:?}", path))?;
        let assignments = hgr_io::fixed::read(io::BufReader::new(file))?;
        anyhow::ensure!(
            assignments.len() == hg.initial_num_vertices(),
            "fixed-vertex file has {} entries for {} vertices",
            assignments.len(),
            hg.initial_num_vertices()
        );
        for (v, assignment) in assignments.iter().enumerate() {
            if let Some(block) = assignment {
                hg.fix_vertex(v as u32, *block);
            }
        }
    }

    let seed = ctx.partition.seed;
    let partitioner = Partitioner::new(ctx)?;
    let outcome = partitioner.partition(&mut hg);

    let feasible = match &outcome {
        Ok(_) => true,
        Err(Error::Infeasible { imbalance }) => {
            eprintln!(
                "no partition within the balance bound was found (imbalance {:.4})",
                imbalance
            );
            false
        }
        Err(_) => {
            outcome?;
            unreachable!()
        }
    };

    let result_path = format!(
        "{}.part{}.epsilon{}.seed{}.decoupe",
        input.display(),
        k,
        epsilon,
        seed
    );
    let output = fs::File::create(&result_path)
        .with_context(|| format!("failed to create {:?}", result_path))?;
    hgr_io::partition::write(io::BufWriter::new(output), &hg.partition())
        .context("failed to write partition")?;

    println!("cut       = {}", decoupe::metrics::hyperedge_cut(&hg));
    println!("km1       = {}", decoupe::metrics::km1(&hg));
    println!("imbalance = {:.6}", decoupe::metrics::imbalance(&hg));
    println!("partition written to {}", result_path);

    Ok(feasible)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("hgr-part: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
