//! Single-decree Paxos demo with up to two competing proposers.

use clap::Parser;
use protomc::Model;
use protomc_cli::opts::SearchOpts;
use protomc_cli::paxos;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "paxos", version, about = "Single-decree Paxos demo")]
struct Cli {
    /// Number of machines
    #[arg(short = 'n', long = "machines", default_value_t = 3)]
    machines: usize,

    /// Index of the first proposer
    #[arg(short = 'p', long = "proposer", default_value_t = 0)]
    proposer: usize,

    /// Index of the second proposer (same as the first for a single
    /// proposer)
    #[arg(short = 'P', long = "proposer2", default_value_t = 0)]
    proposer2: usize,

    #[command(flatten)]
    search: SearchOpts,
}

fn main() {
    let cli = Cli::parse();
    if cli.proposer >= cli.machines {
        eprintln!("paxos: invalid first proposer {}", cli.proposer);
        std::process::exit(1);
    }
    if cli.proposer2 >= cli.machines {
        eprintln!("paxos: invalid second proposer {}", cli.proposer2);
        std::process::exit(1);
    }
    cli.search.init_tracing();

    let mut model = Model::new(
        paxos::machines(cli.machines, &[cli.proposer, cli.proposer2]),
        paxos::invariants(),
    );

    let start = Instant::now();
    let outcome = model.run(&cli.search.run_config());
    if cli.search.time {
        println!("Elapsed time (ns): {}", start.elapsed().as_nanos());
    }

    let terminating = match outcome {
        Ok(t) => t,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if !cli.search.is_quiet() {
        println!("Simulation exited with {} terminating states.", terminating.len());
        for s in &terminating {
            match paxos::learned_values(s).as_slice() {
                [] => println!("  no value learned"),
                vals => println!("  learned value of {:?}", vals),
            }
        }
    }
}
