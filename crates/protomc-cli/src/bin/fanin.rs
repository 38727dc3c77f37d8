//! Many-sender fan-in demo: n senders race one greeting each at a shared
//! receiver.

use clap::Parser;
use protomc::Model;
use protomc_cli::fanin;
use protomc_cli::opts::SearchOpts;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "fanin", version, about = "Many-sender fan-in demo")]
struct Cli {
    /// Number of senders
    #[arg(short = 'n', long = "senders", default_value_t = 9)]
    senders: usize,

    #[command(flatten)]
    search: SearchOpts,
}

fn main() {
    let cli = Cli::parse();
    cli.search.init_tracing();

    let mut model = Model::new(fanin::machines(cli.senders), fanin::invariants(cli.senders));

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
            let log = s.machines[0].log().expect("receiver at index 0");
            println!("  arrival order: {:?}", log);
        }
    }
}
