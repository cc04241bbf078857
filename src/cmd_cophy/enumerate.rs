use crate::cmd_cophy::utils;
use clap::*;
use cophy::libs::recon::reconcile;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("enumerate")
        .about("Lists every MPR")
        .after_help(
            r###"
Lists every optimal MPR in a fixed order. Refuses when there are more
MPRs than --max-mprs.

Examples:
1. All MPRs:
   cophy enumerate tests/cophy/simple.txt

2. Raise the ceiling:
   cophy enumerate tests/cophy/simple.txt --max-mprs 100000
"###,
        )
        .arg(utils::arg_infile())
        .args(utils::args_costs())
        .arg(
            Arg::new("max_mprs")
                .long("max-mprs")
                .num_args(1)
                .default_value("10000")
                .value_parser(value_parser!(u64))
                .help("Refuse to list more MPRs than this"),
        )
        .arg(utils::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    let costs = utils::costs_from(args)?;
    let instance = utils::load_instance(args)?;
    let opt_max = *args.get_one::<u64>("max_mprs").unwrap();

    let rec = reconcile(&instance, &costs)?;
    let mprs = rec.graph.enumerate_mprs(opt_max)?;

    for (i, mpr) in mprs.iter().enumerate() {
        utils::write_mpr(&mut writer, &instance, &format!("MPR {}", i + 1), mpr, &costs)?;
    }

    Ok(())
}
