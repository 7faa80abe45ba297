use anyhow::Result;
use clap::Parser;
use webtime::{
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::single_thread_runtime,
    },
};

// The daemon is intended to be spawned by the browser as a messaging host, so
// unlike most daemons it must keep its stdio attached: stdin carries browser
// events, stdout carries replies and notification requests.
fn main() {
    let args = DaemonArgs::parse();
    run(args).unwrap();
}

fn run(args: DaemonArgs) -> Result<()> {
    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    enable_logging(DAEMON_PREFIX, &app_dir, args.log, args.log_console)?;
    single_thread_runtime()?.block_on(async move { start_daemon(app_dir).await })?;
    Ok(())
}
