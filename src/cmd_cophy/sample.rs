use crate::cmd_cophy::utils;
use clap::*;
use cophy::libs::recon::{reconcile, MprSampler};
use rand::rngs::StdRng;
use rand::SeedableRng;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("sample")
        .about("Draws MPRs uniformly at random")
        .after_help(
            r###"
Every optimal MPR has the same probability of being drawn. Draws are
independent, so an MPR may appear more than once.

Output format:
  #MPR 1	root=q0-m0	cost=4
  q0-m0	S q1-h1 q2-h2
  ...

Examples:
1. Five MPRs:
   cophy sample tests/cophy/simple.txt -n 5

2. A different stream:
   cophy sample tests/cophy/simple.txt -n 5 --seed 42
"###,
        )
        .arg(utils::arg_infile())
        .args(utils::args_costs())
        .arg(
            Arg::new("number")
                .long("number")
                .short('n')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of MPRs to draw"),
        )
        .arg(utils::arg_seed())
        .arg(utils::arg_outfile())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    let costs = utils::costs_from(args)?;
    let instance = utils::load_instance(args)?;
    let opt_number = *args.get_one::<usize>("number").unwrap();
    let opt_seed = *args.get_one::<u64>("seed").unwrap();

    let rec = reconcile(&instance, &costs)?;
    let sampler = MprSampler::new(&rec.graph);
    let mut rng = StdRng::seed_from_u64(opt_seed);

    for i in 1..=opt_number {
        let mpr = sampler
            .sample(&mut rng)
            .ok_or_else(|| anyhow::anyhow!("The graph has no MPR"))?;
        utils::write_mpr(&mut writer, &instance, &format!("MPR {}", i), &mpr, &costs)?;
    }

    Ok(())
}
