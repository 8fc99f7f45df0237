//! Shared plumbing of the decoupe command-line tools: option registration,
//! preset-file loading and translation of textual settings into a
//! [`decoupe::Context`].

use std::fs;
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use decoupe::{Context, Mode, Objective};

/// Registers every tuning option on the getopts parser. The required
/// options (`hypergraph`, `blocks`, `epsilon`, `objective`, `mode`) are
/// registered by the binary itself.
pub fn register_tuning_options(options: &mut getopts::Options) {
    options.optopt("", "seed", "seed of the random number generator", "INT");
    options.optopt("", "vcycles", "number of v-cycle repetitions", "INT");
    options.optopt(
        "",
        "cmaxnet",
        "ignore hyperedges with more pins (-1 = unlimited)",
        "INT",
    );
    options.optopt("", "fixed", "fixed-vertex assignment file", "FILE");
    options.optopt("", "preset", "INI-style preset file, overridden by flags", "FILE");

    for prefix in ["c", "i-c"] {
        options.optopt(
            "",
            &format!("{}-type", prefix),
            "coarsening scheme: ml_style, heavy_lazy or heavy_full",
            "NAME",
        );
        options.optopt(
            "",
            &format!("{}-s", prefix),
            "maximum vertex weight multiplier s",
            "FLOAT",
        );
        options.optopt(
            "",
            &format!("{}-t", prefix),
            "contraction limit multiplier t",
            "INT",
        );
        options.optopt(
            "",
            &format!("{}-rating-score", prefix),
            "rating score: heavy_edge or edge_frequency",
            "NAME",
        );
        options.optopt(
            "",
            &format!("{}-rating-use-communities", prefix),
            "restrict contractions to one community",
            "BOOL",
        );
        options.optopt(
            "",
            &format!("{}-rating-heavy-node-penalty", prefix),
            "heavy vertex penalty: multiplicative_penalty or no_penalty",
            "NAME",
        );
        options.optopt(
            "",
            &format!("{}-rating-acceptance-criterion", prefix),
            "rating acceptance: best or best_prefer_unmatched",
            "NAME",
        );
        options.optopt(
            "",
            &format!("{}-fixed-vertex-acceptance-criterion", prefix),
            "fixed-vertex contraction policy",
            "NAME",
        );
    }

    options.optopt("", "i-algo", "initial partitioning algorithm", "NAME");
    options.optopt("", "i-runs", "initial partitioning trials", "INT");
    options.optopt("", "i-r-fm-stop", "FM stopping rule inside bisections", "NAME");
    options.optopt("", "i-r-fm-stop-i", "fruitless move bound inside bisections", "INT");
    options.optopt("", "i-r-fm-stop-alpha", "adaptive stop alpha inside bisections", "FLOAT");

    options.optopt("", "r-type", "refinement scheme: fm, flow or fm_flow", "NAME");
    options.optopt("", "r-runs", "FM repetitions per level", "INT");
    options.optopt("", "r-fm-stop", "FM stopping rule: simple or adaptive_opt", "NAME");
    options.optopt("", "r-fm-stop-i", "fruitless move bound of the simple rule", "INT");
    options.optopt("", "r-fm-stop-alpha", "alpha of the adaptive rule (inf disables)", "FLOAT");
    options.optopt("", "r-flow-algorithm", "max-flow algorithm", "NAME");
    options.optopt("", "r-flow-network", "flow network kind: lawler or hybrid", "NAME");
    options.optopt("", "r-flow-execution-policy", "constant, exponential or multilevel", "NAME");
    options.optopt("", "r-flow-alpha", "flow region scaling factor", "FLOAT");
    options.optopt("", "r-flow-beta", "level distance of the constant policy", "INT");
    options.optopt("", "r-flow-use-most-balanced-minimum-cut", "", "BOOL");
    options.optopt("", "r-flow-use-adaptive-alpha-stopping-rule", "", "BOOL");
    options.optopt("", "r-flow-ignore-small-hyperedge-cut", "", "BOOL");
}

const TUNING_KEYS: [&str; 37] = [
    "seed",
    "vcycles",
    "cmaxnet",
    "c-type",
    "c-s",
    "c-t",
    "c-rating-score",
    "c-rating-use-communities",
    "c-rating-heavy-node-penalty",
    "c-rating-acceptance-criterion",
    "c-fixed-vertex-acceptance-criterion",
    "i-algo",
    "i-runs",
    "i-c-type",
    "i-c-s",
    "i-c-t",
    "i-c-rating-score",
    "i-c-rating-use-communities",
    "i-c-rating-heavy-node-penalty",
    "i-c-rating-acceptance-criterion",
    "i-c-fixed-vertex-acceptance-criterion",
    "i-r-fm-stop",
    "i-r-fm-stop-i",
    "i-r-fm-stop-alpha",
    "r-type",
    "r-runs",
    "r-fm-stop",
    "r-fm-stop-i",
    "r-fm-stop-alpha",
    "r-flow-algorithm",
    "r-flow-network",
    "r-flow-execution-policy",
    "r-flow-alpha",
    "r-flow-beta",
    "r-flow-use-most-balanced-minimum-cut",
    "r-flow-use-adaptive-alpha-stopping-rule",
    "r-flow-ignore-small-hyperedge-cut",
];

/// Builds the full context: preset settings first, command-line flags on
/// top.
pub fn build_context(
    k: usize,
    epsilon: f64,
    objective: Objective,
    mode: Mode,
    preset: Option<&Path>,
    matches: &getopts::Matches,
) -> Result<Context> {
    let mut ctx = Context::new(k, epsilon, objective, mode);
    if let Some(path) = preset {
        for (key, value) in read_preset(path)? {
            apply_setting(&mut ctx, &key, &value)
                .with_context(|| format!("in preset {:?}", path))?;
        }
    }
    for key in TUNING_KEYS {
        if let Some(value) = matches.opt_str(key) {
            apply_setting(&mut ctx, key, &value)?;
        }
    }
    Ok(ctx)
}

/// Reads an INI-style preset: `key = value` lines, `#`/`;` comments,
/// section headers ignored.
pub fn read_preset(path: &Path) -> Result<Vec<(String, String)>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read preset {:?}", path))?;
    let mut settings = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            bail!("preset {:?} line {}: expected key = value", path, lineno + 1);
        };
        settings.push((key.trim().to_owned(), value.trim().to_owned()));
    }
    Ok(settings)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => bail!("expected a boolean, found {:?}", value),
    }
}

/// Applies one textual setting; keys mirror the command-line names.
pub fn apply_setting(ctx: &mut Context, key: &str, value: &str) -> Result<()> {
    let parse_err = || format!("bad value {:?} for {:?}", value, key);
    match key {
        "seed" => ctx.partition.seed = value.parse().with_context(parse_err)?,
        "vcycles" => ctx.partition.vcycles = value.parse().with_context(parse_err)?,
        "cmaxnet" => {
            let max: i64 = value.parse().with_context(parse_err)?;
            ctx.partition.max_net_size = if max < 0 { None } else { Some(max as usize) };
        }
        "c-type" => ctx.coarsening.scheme = value.parse()?,
        "c-s" => {
            ctx.coarsening.max_allowed_weight_multiplier =
                value.parse().with_context(parse_err)?
        }
        "c-t" => {
            ctx.coarsening.contraction_limit_multiplier =
                value.parse().with_context(parse_err)?
        }
        "c-rating-score" => ctx.coarsening.rating.score = value.parse()?,
        "c-rating-use-communities" => {
            ctx.coarsening.rating.use_communities = parse_bool(value)?
        }
        "c-rating-heavy-node-penalty" => ctx.coarsening.rating.penalty = value.parse()?,
        "c-rating-acceptance-criterion" => {
            ctx.coarsening.rating.acceptance = value.parse()?
        }
        "c-fixed-vertex-acceptance-criterion" => {
            ctx.coarsening.rating.fixed_vertex_acceptance = value.parse()?
        }
        "i-algo" => ctx.initial.algorithm = value.parse()?,
        "i-runs" => ctx.initial.runs = value.parse().with_context(parse_err)?,
        "i-c-type" => ctx.initial.coarsening.scheme = value.parse()?,
        "i-c-s" => {
            ctx.initial.coarsening.max_allowed_weight_multiplier =
                value.parse().with_context(parse_err)?
        }
        "i-c-t" => {
            ctx.initial.coarsening.contraction_limit_multiplier =
                value.parse().with_context(parse_err)?
        }
        "i-c-rating-score" => ctx.initial.coarsening.rating.score = value.parse()?,
        "i-c-rating-use-communities" => {
            ctx.initial.coarsening.rating.use_communities = parse_bool(value)?
        }
        "i-c-rating-heavy-node-penalty" => {
            ctx.initial.coarsening.rating.penalty = value.parse()?
        }
        "i-c-rating-acceptance-criterion" => {
            ctx.initial.coarsening.rating.acceptance = value.parse()?
        }
        "i-c-fixed-vertex-acceptance-criterion" => {
            ctx.initial.coarsening.rating.fixed_vertex_acceptance = value.parse()?
        }
        "i-r-fm-stop" => ctx.initial.fm.stop = value.parse()?,
        "i-r-fm-stop-i" => {
            ctx.initial.fm.max_fruitless_moves = value.parse().with_context(parse_err)?
        }
        "i-r-fm-stop-alpha" => {
            ctx.initial.fm.adaptive_alpha = value.parse().with_context(parse_err)?
        }
        "r-type" => ctx.local_search.scheme = value.parse()?,
        "r-runs" => ctx.local_search.runs = value.parse().with_context(parse_err)?,
        "r-fm-stop" => ctx.local_search.fm.stop = value.parse()?,
        "r-fm-stop-i" => {
            ctx.local_search.fm.max_fruitless_moves =
                value.parse().with_context(parse_err)?
        }
        "r-fm-stop-alpha" => {
            ctx.local_search.fm.adaptive_alpha = value.parse().with_context(parse_err)?
        }
        "r-flow-algorithm" => ctx.local_search.flow.algorithm = value.parse()?,
        "r-flow-network" => ctx.local_search.flow.network = value.parse()?,
        "r-flow-execution-policy" => ctx.local_search.flow.execution = value.parse()?,
        "r-flow-alpha" => {
            ctx.local_search.flow.alpha = value.parse().with_context(parse_err)?
        }
        "r-flow-beta" => {
            ctx.local_search.flow.beta = value.parse().with_context(parse_err)?
        }
        "r-flow-use-most-balanced-minimum-cut" => {
            ctx.local_search.flow.use_most_balanced_minimum_cut = parse_bool(value)?
        }
        "r-flow-use-adaptive-alpha-stopping-rule" => {
            ctx.local_search.flow.use_adaptive_alpha_stopping_rule = parse_bool(value)?
        }
        "r-flow-ignore-small-hyperedge-cut" => {
            ctx.local_search.flow.ignore_small_net_cut = parse_bool(value)?
        }
        _ => bail!("unknown option {:?}", key),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use decoupe::{CoarseningScheme, FlowAlgorithm, RefinementScheme};

    fn base() -> Context {
        Context::new(2, 0.03, Objective::Km1, Mode::Direct)
    }

    #[test]
    fn applies_textual_settings() {
        let mut ctx = base();
        apply_setting(&mut ctx, "seed", "99").unwrap();
        apply_setting(&mut ctx, "c-type", "heavy_lazy").unwrap();
        apply_setting(&mut ctx, "r-type", "fm_flow").unwrap();
        apply_setting(&mut ctx, "r-flow-algorithm", "boykov_kolmogorov").unwrap();
        apply_setting(&mut ctx, "r-flow-use-most-balanced-minimum-cut", "false").unwrap();
        assert_eq!(ctx.partition.seed, 99);
        assert_eq!(ctx.coarsening.scheme, CoarseningScheme::HeavyLazy);
        assert_eq!(ctx.local_search.scheme, RefinementScheme::FmFlow);
        assert_eq!(
            ctx.local_search.flow.algorithm,
            FlowAlgorithm::BoykovKolmogorov
        );
        assert!(!ctx.local_search.flow.use_most_balanced_minimum_cut);
    }

    #[test]
    fn negative_cmaxnet_means_unlimited() {
        let mut ctx = base();
        apply_setting(&mut ctx, "cmaxnet", "-1").unwrap();
        assert_eq!(ctx.partition.max_net_size, None);
        apply_setting(&mut ctx, "cmaxnet", "50").unwrap();
        assert_eq!(ctx.partition.max_net_size, Some(50));
    }

    #[test]
    fn rejects_unknown_keys_and_values() {
        let mut ctx = base();
        assert!(apply_setting(&mut ctx, "c-type", "steepest_descent").is_err());
        assert!(apply_setting(&mut ctx, "frobnicate", "1").is_err());
    }
}
