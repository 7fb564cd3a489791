use std::process::ExitCode;

fn main() -> ExitCode {
    circle_cli::init_logging();
    circle_cli::run()
}
