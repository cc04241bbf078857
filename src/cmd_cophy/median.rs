use crate::cmd_cophy::utils;
use clap::*;
use cophy::libs::recon::median::median;
use cophy::libs::recon::reconcile;
use cophy::libs::recon::sif::write_sif;
use rand::rngs::StdRng;
use rand::SeedableRng;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("median")
        .about("Finds the median MPRs")
        .after_help(
            r###"
A median MPR minimizes the summed distance to every optimal MPR. There may
be several; one of them is drawn uniformly with --seed and printed.

Output format:
  #median	count=2	score=5
  #MPR	root=q0-m0	cost=4
  q0-m0	S q1-h1 q2-h2
  ...

Examples:
1. A median MPR:
   cophy median tests/cophy/simple.txt

2. Dump every median as a graph:
   cophy median tests/cophy/simple.txt --sif median.sif
"###,
        )
        .arg(utils::arg_infile())
        .args(utils::args_costs())
        .arg(utils::arg_seed())
        .arg(
            Arg::new("sif")
                .long("sif")
                .num_args(1)
                .help("Write the median sub-graph to this file"),
        )
        .arg(utils::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    let costs = utils::costs_from(args)?;
    let instance = utils::load_instance(args)?;
    let opt_seed = *args.get_one::<u64>("seed").unwrap();

    let rec = reconcile(&instance, &costs)?;
    let mut rng = StdRng::seed_from_u64(opt_seed);
    let med = median(&rec.graph, &mut rng)?;

    writer.write_fmt(format_args!(
        "#median\tcount={}\tscore={}\n",
        med.count, med.score
    ))?;
    utils::write_mpr(&mut writer, &instance, "MPR", &med.random_median, &costs)?;

    if let Some(sif) = args.get_one::<String>("sif") {
        let mut out = intspan::writer(sif);
        write_sif(&mut out, &instance, &med.graph)?;
    }

    Ok(())
}
