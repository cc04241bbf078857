use crate::cmd_cophy::utils;
use clap::*;
use itertools::Itertools;
use cophy::libs::recon::sif::{node_label, write_sif};
use cophy::libs::recon::reconcile;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("recon")
        .about("Solves the DTL reconciliation problem")
        .after_help(
            r###"
Computes the minimum cost of reconciling the parasite tree with the host
tree and builds the reconciliation graph holding every optimal MPR.

Output format:
* Key-value pairs (TSV):
  cost	4
  mprs	3
  roots	q0-m0,q0-h1
  nodes	12
  events	17

Examples:
1. Default costs (D=2, T=3, L=1):
   cophy recon tests/cophy/simple.txt

2. Custom costs, dumping the graph:
   cophy recon tests/cophy/simple.txt -D 1 -T 1 -L 1 --sif graph.sif
"###,
        )
        .arg(utils::arg_infile())
        .args(utils::args_costs())
        .arg(
            Arg::new("sif")
                .long("sif")
                .num_args(1)
                .help("Write the reconciliation graph to this file"),
        )
        .arg(utils::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    let costs = utils::costs_from(args)?;
    let instance = utils::load_instance(args)?;

    let rec = reconcile(&instance, &costs)?;

    let roots = rec
        .roots
        .iter()
        .map(|r| node_label(&instance, r))
        .join(",");
    writer.write_fmt(format_args!("cost\t{}\n", rec.cost))?;
    writer.write_fmt(format_args!("mprs\t{}\n", rec.count))?;
    writer.write_fmt(format_args!("roots\t{}\n", roots))?;
    writer.write_fmt(format_args!("nodes\t{}\n", rec.graph.len()))?;
    writer.write_fmt(format_args!("events\t{}\n", rec.graph.event_count()))?;

    if let Some(sif) = args.get_one::<String>("sif") {
        let mut out = intspan::writer(sif);
        write_sif(&mut out, &instance, &rec.graph)?;
    }
    Ok(())
}
