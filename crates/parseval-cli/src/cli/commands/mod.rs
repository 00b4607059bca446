mod cases;
mod report;
mod run;

use super::args::{Cli, Command};

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Run {
            config,
            optimize,
            json_out,
            parallel,
            timeout_seconds,
        } => {
            run::execute(run::RunOptions {
                config,
                optimize,
                json_out,
                parallel,
                timeout_seconds,
            })
            .await
        }
        Command::Cases { config } => cases::execute(&config),
        Command::Report { artifact } => report::execute(&artifact),
    }
}
