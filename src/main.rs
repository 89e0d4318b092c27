use std::process;
use trs::run;

fn main() {
    if let Err(e) = run() {
        eprintln!("trs: {}", e);
        process::exit(1);
    }
}
