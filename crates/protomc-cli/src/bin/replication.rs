//! N-way replication demo: client, server, and n replica nodes.

use clap::Parser;
use protomc::Model;
use protomc_cli::opts::SearchOpts;
use protomc_cli::replication;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "replication", version, about = "N-way replication demo")]
struct Cli {
    /// Number of replica nodes
    #[arg(short = 'n', long = "nodes", default_value_t = 3)]
    nodes: usize,

    /// Number of data items the client sends
    #[arg(short = 'r', long = "rounds", default_value_t = 1)]
    rounds: usize,

    #[command(flatten)]
    search: SearchOpts,
}

fn main() {
    let cli = Cli::parse();
    if cli.rounds == 0 {
        eprintln!("replication: at least one round is required");
        std::process::exit(1);
    }
    cli.search.init_tracing();

    let mut model = Model::new(
        replication::machines(cli.nodes, replication::demo_data(cli.rounds)),
        replication::invariants(),
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
            let client = s.machines[0].client().expect("client at index 0");
            println!(
                "  client delivered {}/{} items",
                client.index,
                client.data.len()
            );
        }
    }
}
