use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    rewrites::app::run_cli(std::env::args().skip(1))
}
