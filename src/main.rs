mod commands;

use crate::commands::Backlog;
use clap::Parser;
use std::process::ExitCode;
use yansi::Paint;

fn render_error(err: &eyre::Report) -> String {
    format!("Error: {}\n\nCaused by:\n  {}", err, err.root_cause())
}

fn main() -> ExitCode {
    let backlog = Backlog::parse();

    match backlog.run() {
        Err(err) => {
            eprintln!("{}", render_error(&err).red());
            ExitCode::from(1)
        }
        Ok(_) => ExitCode::from(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_shows_root_cause() {
        let err = eyre::eyre!("no such file").wrap_err("Failed reading config");

        assert_eq!(
            render_error(&err),
            "Error: Failed reading config\n\nCaused by:\n  no such file"
        );
    }
}
