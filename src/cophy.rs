extern crate clap;
use clap::*;
use tracing_subscriber::EnvFilter;

mod cmd_cophy;

fn main() -> anyhow::Result<()> {
    let app = Command::new("cophy")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`cophy` - Cophylogenetic reconciliation under the DTL model")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Log more to stderr; repeat for debug output. RUST_LOG takes precedence"),
        )
        .subcommand(cmd_cophy::recon::make_subcommand())
        .subcommand(cmd_cophy::sample::make_subcommand())
        .subcommand(cmd_cophy::enumerate::make_subcommand())
        .subcommand(cmd_cophy::pdv::make_subcommand())
        .subcommand(cmd_cophy::median::make_subcommand())
        .subcommand(cmd_cophy::support::make_subcommand())
        .subcommand(cmd_cophy::cluster::make_subcommand())
        .subcommand(cmd_cophy::pvalue::make_subcommand())
        .subcommand(cmd_cophy::sif::make_subcommand())
        .after_help(
            r###"Subcommand groups:

* Reconciliation:
    * recon     - Optimal cost, MPR count and the reconciliation graph
    * sample    - Uniformly sampled MPRs
    * enumerate - Every MPR of a small graph
    * sif       - Reload a graph dump and summarize it

* MPR space:
    * pdv     - Histogram of pairwise MPR distances
    * median  - Median MPRs
    * support - Per-event support
    * cluster - Partition MPR space into k clusters

* Significance:
    * pvalue - Monte-Carlo test against random tip mappings

Input format:
    host Newick tree;
    parasite Newick tree;
    parasite_leaf:host_leaf
    ...

"###,
        );

    let matches = app.get_matches();
    init_logging(matches.get_count("verbose"));

    // Check which subcomamnd the user ran...
    match matches.subcommand() {
        Some(("recon", sub_matches)) => cmd_cophy::recon::execute(sub_matches),
        Some(("sample", sub_matches)) => cmd_cophy::sample::execute(sub_matches),
        Some(("enumerate", sub_matches)) => cmd_cophy::enumerate::execute(sub_matches),
        Some(("pdv", sub_matches)) => cmd_cophy::pdv::execute(sub_matches),
        Some(("median", sub_matches)) => cmd_cophy::median::execute(sub_matches),
        Some(("support", sub_matches)) => cmd_cophy::support::execute(sub_matches),
        Some(("cluster", sub_matches)) => cmd_cophy::cluster::execute(sub_matches),
        Some(("pvalue", sub_matches)) => cmd_cophy::pvalue::execute(sub_matches),
        Some(("sif", sub_matches)) => cmd_cophy::sif::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
