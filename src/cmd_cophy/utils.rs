use clap::*;
use cophy::libs::recon::sif::{event_label, node_label};
use cophy::libs::recon::{CostParams, Instance, Mpr};
use std::io::Write;

pub fn arg_infile() -> Arg {
    Arg::new("infile")
        .required(true)
        .num_args(1)
        .index(1)
        .help("Input filename. [stdin] for standard input")
}

pub fn arg_outfile() -> Arg {
    Arg::new("outfile")
        .short('o')
        .long("outfile")
        .num_args(1)
        .default_value("stdout")
        .help("Output filename. [stdout] for screen")
}

/// -D/-T/-L event costs
pub fn args_costs() -> [Arg; 3] {
    [
        Arg::new("dup")
            .short('D')
            .long("dup")
            .num_args(1)
            .default_value("2")
            .value_parser(value_parser!(f64))
            .help("Duplication cost"),
        Arg::new("trans")
            .short('T')
            .long("trans")
            .num_args(1)
            .default_value("3")
            .value_parser(value_parser!(f64))
            .help("Transfer cost"),
        Arg::new("loss")
            .short('L')
            .long("loss")
            .num_args(1)
            .default_value("1")
            .value_parser(value_parser!(f64))
            .help("Loss cost"),
    ]
}

pub fn arg_seed() -> Arg {
    Arg::new("seed")
        .long("seed")
        .num_args(1)
        .default_value("0")
        .value_parser(value_parser!(u64))
        .help("Random seed")
}

pub fn arg_parallel() -> Arg {
    Arg::new("parallel")
        .long("parallel")
        .short('p')
        .num_args(1)
        .default_value("1")
        .value_parser(value_parser!(usize))
        .help("Number of threads")
}

pub fn costs_from(args: &ArgMatches) -> anyhow::Result<CostParams> {
    let costs = CostParams::new(
        *args.get_one::<f64>("dup").unwrap(),
        *args.get_one::<f64>("trans").unwrap(),
        *args.get_one::<f64>("loss").unwrap(),
    )?;
    Ok(costs)
}

pub fn load_instance(args: &ArgMatches) -> anyhow::Result<Instance> {
    let infile = args.get_one::<String>("infile").unwrap();
    Instance::from_file(infile).map_err(|e| anyhow::anyhow!("{}: {}", infile, e))
}

pub fn init_pool(args: &ArgMatches) -> anyhow::Result<()> {
    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel)
        .build_global()?;
    Ok(())
}

/// One `node<TAB>event` line per event, preceded by a `#` header.
pub fn write_mpr(
    writer: &mut dyn Write,
    instance: &Instance,
    header: &str,
    mpr: &Mpr,
    costs: &CostParams,
) -> anyhow::Result<()> {
    writer.write_fmt(format_args!(
        "#{}\troot={}\tcost={}\n",
        header,
        node_label(instance, &mpr.root()),
        mpr.cost(costs)
    ))?;
    for (m, e) in mpr.events() {
        writer.write_fmt(format_args!(
            "{}\t{}\n",
            node_label(instance, m),
            event_label(instance, m, e)
        ))?;
    }
    Ok(())
}
