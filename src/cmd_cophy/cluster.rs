use crate::cmd_cophy::utils;
use clap::*;
use cophy::libs::recon::cluster::cluster;
use cophy::libs::recon::{reconcile, ClusterConfig, PdvOptions, Scorer, SplitMode};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("cluster")
        .about("Groups the MPRs into k clusters")
        .after_help(
            r###"
The reconciliation graph is first split into seed sub-graphs at nodes every
MPR passes through, then the seeds are merged pairwise, each time picking
the merge that raises the weighted dispersion the least.

Split modes:
* depth=D  - split at nodes whose parasite depth is below D
* nmprs=N  - split until there are at least N seeds

Scorers:
* pdv      - mean pairwise distance within a cluster
* support  - negated mean support of the cluster's events

Output format:
* TSV with a header: cluster	seeds	mprs	weight	score
* A trailing line: #objective	<value>

Examples:
1. Two clusters:
   cophy cluster tests/cophy/simple.txt -k 2

2. Support scorer, finer split, 4 threads:
   cophy cluster tests/cophy/simple.txt -k 3 --mode nmprs=8 --scorer support --parallel 4
"###,
        )
        .arg(utils::arg_infile())
        .args(utils::args_costs())
        .arg(
            Arg::new("k")
                .short('k')
                .num_args(1)
                .default_value("2")
                .value_parser(value_parser!(usize))
                .help("Number of clusters"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .num_args(1)
                .default_value("depth=3")
                .help("How far to split: depth=D or nmprs=N"),
        )
        .arg(
            Arg::new("scorer")
                .long("scorer")
                .num_args(1)
                .value_parser(["pdv", "support"])
                .default_value("pdv")
                .help("Within-cluster dispersion"),
        )
        .arg(
            Arg::new("max_splits")
                .long("max-splits")
                .num_args(1)
                .default_value("256")
                .value_parser(value_parser!(usize))
                .help("Upper bound on the number of seeds"),
        )
        .arg(
            Arg::new("zero_loss")
                .long("zero-loss")
                .action(ArgAction::SetTrue)
                .help("Loss events contribute nothing to the distance"),
        )
        .arg(utils::arg_parallel())
        .arg(utils::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    let costs = utils::costs_from(args)?;
    let instance = utils::load_instance(args)?;
    utils::init_pool(args)?;

    let config = ClusterConfig {
        k: *args.get_one::<usize>("k").unwrap(),
        mode: args.get_one::<String>("mode").unwrap().parse::<SplitMode>()?,
        scorer: args.get_one::<String>("scorer").unwrap().parse::<Scorer>()?,
        max_splits: *args.get_one::<usize>("max_splits").unwrap(),
        pdv: PdvOptions {
            zero_loss: args.get_flag("zero_loss"),
            normalize: false,
        },
    };

    let rec = reconcile(&instance, &costs)?;
    let res = cluster(&instance, &rec.graph, &config)?;

    writer.write_fmt(format_args!("cluster\tseeds\tmprs\tweight\tscore\n"))?;
    for (i, c) in res.clusters.iter().enumerate() {
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\t{:.4}\t{:.4}\n",
            i + 1,
            c.seeds.len(),
            c.count,
            c.weight,
            c.score
        ))?;
    }
    writer.write_fmt(format_args!("#objective\t{:.4}\n", res.objective))?;

    Ok(())
}
