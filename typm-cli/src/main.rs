//! Binary entrypoint for typm (made by FontLab https://www.fontlab.com/)

fn main() {
    if let Err(err) = typm_cli::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
