// src/main.rs

use env_logger::Env;
use log::error;
use num::BigInt;
use simpqs::core::error::SimpqsError;
use simpqs::{factor, SimpqsConfig};
use std::io::{self, BufRead, Write};
use std::str::FromStr;

fn main() {
    let config = SimpqsConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config: {}. Using defaults.", e);
        SimpqsConfig::default()
    });

    let env = Env::default().filter_or("SIMPQS_LOG", config.log_level.clone());
    env_logger::Builder::from_env(env).init();

    print!("Input number to factor [ >=40 decimal digits]: ");
    io::stdout().flush().expect("stdout unavailable");

    let stdin = io::stdin();
    let mut line = String::new();
    if stdin.lock().read_line(&mut line).is_err() {
        eprintln!("Error reading input.");
        std::process::exit(1);
    }
    let n = match BigInt::from_str(line.trim()) {
        Ok(n) => n,
        Err(_) => {
            eprintln!("Error in input or number has too few digits.");
            std::process::exit(1);
        }
    };

    match factor(&n, &config) {
        Ok(factors) => {
            println!("FACTORS:");
            for f in factors {
                println!("{}", f);
            }
        }
        Err(SimpqsError::InputTooSmall(_)) => {
            eprintln!("Error in input or number has too few digits.");
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }

    // keep the terminal open until a key is pressed
    let mut pause = String::new();
    let _ = stdin.lock().read_line(&mut pause);
}
