use std::process::ExitCode;

fn main() -> ExitCode {
    match commit_headless::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            commit_headless::ui::output::Logger::from_env(
                commit_headless::ui::output::Verbosity::Normal,
            )
            .error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
