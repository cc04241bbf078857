use crate::cmd_cophy::utils;
use clap::*;
use cophy::libs::recon::reconcile;
use cophy::libs::recon::sif::{event_label, node_label};
use cophy::libs::recon::support::event_support;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("support")
        .about("Fraction of MPRs using each event")
        .after_help(
            r###"
Output format:
* TSV with a header: node	event	count	support

Examples:
1. Support of every event:
   cophy support tests/cophy/simple.txt

2. Only events some MPRs disagree on:
   cophy support tests/cophy/simple.txt --min 0 --max 0.99
"###,
        )
        .arg(utils::arg_infile())
        .args(utils::args_costs())
        .arg(
            Arg::new("min")
                .long("min")
                .num_args(1)
                .default_value("0")
                .value_parser(value_parser!(f64))
                .help("Skip events with a smaller support"),
        )
        .arg(
            Arg::new("max")
                .long("max")
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(f64))
                .help("Skip events with a larger support"),
        )
        .arg(utils::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    let costs = utils::costs_from(args)?;
    let instance = utils::load_instance(args)?;
    let opt_min = *args.get_one::<f64>("min").unwrap();
    let opt_max = *args.get_one::<f64>("max").unwrap();

    let rec = reconcile(&instance, &costs)?;

    writer.write_fmt(format_args!("node\tevent\tcount\tsupport\n"))?;
    for s in event_support(&rec.graph) {
        if s.support < opt_min || s.support > opt_max {
            continue;
        }
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\t{:.4}\n",
            node_label(&instance, &s.node),
            event_label(&instance, &s.node, &s.event),
            s.count,
            s.support
        ))?;
    }

    Ok(())
}
