use crate::cmd_cophy::utils;
use clap::*;
use cophy::libs::recon::diameter::{diameter, pdv, pdv_with_options, score_nodp};
use cophy::libs::recon::{reconcile, PdvOptions};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("pdv")
        .about("Pairwise distance histogram of the MPRs")
        .after_help(
            r###"
Counts, for every distance d, the ordered pairs of MPRs (M1, M2) whose
event sets differ in d (mapping node, event) pairs. Self pairs are
included, so the counts sum to the square of the MPR count.

Output format:
* TSV with a header: distance	count

Examples:
1. Raw histogram:
   cophy pdv tests/cophy/simple.txt

2. Distances relative to the tree size, loss events ignored:
   cophy pdv tests/cophy/simple.txt --zero-loss --normalize

3. Summary statistics only:
   cophy pdv tests/cophy/simple.txt --stats
"###,
        )
        .arg(utils::arg_infile())
        .args(utils::args_costs())
        .arg(
            Arg::new("zero_loss")
                .long("zero-loss")
                .action(ArgAction::SetTrue)
                .help("Loss events contribute nothing to the distance"),
        )
        .arg(
            Arg::new("normalize")
                .long("normalize")
                .action(ArgAction::SetTrue)
                .help("Divide distances by twice the number of internal parasite nodes and counts by their total"),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .action(ArgAction::SetTrue)
                .help("Print mean, variance and diameter instead of the histogram"),
        )
        .arg(utils::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    let costs = utils::costs_from(args)?;
    let instance = utils::load_instance(args)?;
    let opts = PdvOptions {
        zero_loss: args.get_flag("zero_loss"),
        normalize: args.get_flag("normalize"),
    };

    let rec = reconcile(&instance, &costs)?;

    if args.get_flag("stats") {
        let hist = pdv(&instance, &rec.graph, opts.zero_loss)?;
        writer.write_fmt(format_args!("mprs\t{}\n", rec.count))?;
        writer.write_fmt(format_args!("pairs\t{}\n", hist.sum()))?;
        writer.write_fmt(format_args!("diameter\t{}\n", diameter(&hist)))?;
        writer.write_fmt(format_args!("mean\t{:.4}\n", score_nodp(&hist)))?;
        if let Some(var) = hist.variance() {
            writer.write_fmt(format_args!("variance\t{:.4}\n", var))?;
        }
        return Ok(());
    }

    writer.write_fmt(format_args!("distance\tcount\n"))?;
    if opts.normalize {
        let density = pdv_with_options(&instance, &rec.graph, &opts)?.normalize_y();
        for (x, y) in density.points() {
            writer.write_fmt(format_args!("{:.4}\t{:.6}\n", x, y))?;
        }
    } else {
        let hist = pdv(&instance, &rec.graph, opts.zero_loss)?;
        for (k, v) in hist.iter() {
            writer.write_fmt(format_args!("{}\t{}\n", k, v))?;
        }
    }

    Ok(())
}
