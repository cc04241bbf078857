use crate::cmd_cophy::utils;
use clap::*;
use itertools::Itertools;
use cophy::libs::recon::sif::{from_sif, node_label};
use cophy::libs::recon::EventKind;
use std::io::Read;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("sif")
        .about("Loads a graph dump and summarizes it")
        .after_help(
            r###"
Reads a reconciliation graph written by `cophy recon --sif` or
`cophy median --sif`, checks it against the instance and prints its size.

Graph format (tab-separated):
  q0-m1	me	S q1-h2 p3-h1
  S q1-h2 p3-h1	em	q1-h2

Output format:
* Key-value pairs (TSV): roots, nodes, events, mprs and one line per event kind

Examples:
1. Round trip:
   cophy recon tests/cophy/simple.txt --sif graph.sif
   cophy sif tests/cophy/simple.txt --graph graph.sif
"###,
        )
        .arg(utils::arg_infile())
        .arg(
            Arg::new("graph")
                .long("graph")
                .short('g')
                .required(true)
                .num_args(1)
                .help("Graph file"),
        )
        .arg(utils::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    let instance = utils::load_instance(args)?;
    let graph_file = args.get_one::<String>("graph").unwrap();

    let mut text = String::new();
    intspan::reader(graph_file).read_to_string(&mut text)?;
    let graph = from_sif(&instance, &text)
        .map_err(|e| anyhow::anyhow!("{}: {}", graph_file, e))?;

    let roots = graph
        .roots()
        .iter()
        .map(|r| node_label(&instance, r))
        .join(",");
    writer.write_fmt(format_args!("roots\t{}\n", roots))?;
    writer.write_fmt(format_args!("nodes\t{}\n", graph.len()))?;
    writer.write_fmt(format_args!("events\t{}\n", graph.event_count()))?;
    writer.write_fmt(format_args!("mprs\t{}\n", graph.count_mprs()))?;

    for kind in [
        EventKind::Speciation,
        EventKind::Duplication,
        EventKind::Transfer,
        EventKind::Loss,
        EventKind::Contemporaneous,
    ] {
        let n = graph
            .nodes()
            .flat_map(|(_, events)| events.iter())
            .filter(|e| e.kind == kind)
            .count();
        writer.write_fmt(format_args!("{}\t{}\n", kind.tag(), n))?;
    }

    Ok(())
}
