//! Ack/retransmit demo: one sender, one receiver, an optionally lossy
//! network.

use clap::Parser;
use protomc::Model;
use protomc_cli::ack;
use protomc_cli::opts::SearchOpts;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "ack", version, about = "Ack/retransmit protocol demo")]
struct Cli {
    /// Value the sender transmits
    #[arg(short = 'v', long = "value", default_value_t = 42)]
    value: i64,

    /// Retransmissions the sender may attempt
    #[arg(short = 'r', long = "retries", default_value_t = 1)]
    retries: u32,

    /// Let the network drop value messages
    #[arg(short = 'l', long = "lossy")]
    lossy: bool,

    #[command(flatten)]
    search: SearchOpts,
}

fn main() {
    let cli = Cli::parse();
    cli.search.init_tracing();

    let mut model = Model::new(
        ack::machines(cli.value, cli.retries, cli.lossy),
        ack::invariants(cli.value),
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
            let sender = s.machines[0].sender().expect("sender at index 0");
            let receiver = s.machines[1].receiver().expect("receiver at index 1");
            println!(
                "  acknowledged: {}, received: {}",
                sender.ack,
                receiver
                    .val
                    .map_or_else(|| "nothing".to_string(), |v| v.to_string())
            );
        }
    }
}
