use vitrine::cli::CliOverrides;
use vitrine::run_with_overrides;

fn main() {
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = pollster::block_on(run_with_overrides(cli)) {
        eprintln!("Application error: {err:?}");
    }
}
