use std::process::ExitCode;

mod bootstrap;
mod editor_scene;
mod game_scene;
mod loop_runner;

pub(crate) fn run() -> ExitCode {
    match bootstrap::build_app() {
        Ok(Some(wiring)) => loop_runner::run(wiring),
        Ok(None) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}
