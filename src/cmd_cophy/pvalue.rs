use crate::cmd_cophy::utils;
use clap::*;
use cophy::libs::recon::pvalue::p_value;
use cophy::libs::recon::MonteCarloConfig;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("pvalue")
        .about("Monte-Carlo significance of the reconciliation cost")
        .after_help(
            r###"
Compares the optimal cost with those of random tip mappings that keep the
number of parasites on each host leaf.

p = (1 + #{trials with cost <= observed}) / (trials + 1)

Output format:
* Key-value pairs (TSV):
  observed	0
  trials	100
  failures	0
  p-value	0.0099

* With --costs, one `#trial<TAB>cost` line per trial follows.

Examples:
1. 100 trials:
   cophy pvalue tests/cophy/simple.txt

2. 1000 trials on 8 threads:
   cophy pvalue tests/cophy/simple.txt --trials 1000 --parallel 8
"###,
        )
        .arg(utils::arg_infile())
        .args(utils::args_costs())
        .arg(
            Arg::new("trials")
                .long("trials")
                .num_args(1)
                .default_value("100")
                .value_parser(value_parser!(usize))
                .help("Number of random tip mappings"),
        )
        .arg(utils::arg_seed())
        .arg(
            Arg::new("costs")
                .long("costs")
                .action(ArgAction::SetTrue)
                .help("Also print the cost of every trial"),
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

    let config = MonteCarloConfig {
        trials: *args.get_one::<usize>("trials").unwrap(),
        seed: *args.get_one::<u64>("seed").unwrap(),
    };

    let res = p_value(&instance, &costs, &config)?;

    writer.write_fmt(format_args!("observed\t{}\n", res.observed))?;
    writer.write_fmt(format_args!("trials\t{}\n", res.trials.len()))?;
    writer.write_fmt(format_args!("failures\t{}\n", res.failures()))?;
    writer.write_fmt(format_args!("p-value\t{:.4}\n", res.p_value))?;

    if args.get_flag("costs") {
        for (i, t) in res.trials.iter().enumerate() {
            match t {
                Ok(c) => writer.write_fmt(format_args!("#{}\t{}\n", i + 1, c))?,
                Err(e) => writer.write_fmt(format_args!("#{}\tNA\t{}\n", i + 1, e))?,
            }
        }
    }

    Ok(())
}
