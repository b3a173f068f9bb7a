// src/main.rs

use wf::{cli, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run(cli::parse()).await {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
