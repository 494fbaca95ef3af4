use std::process::ExitCode;

fn main() -> ExitCode {
    charterdesk_cli::run()
}
