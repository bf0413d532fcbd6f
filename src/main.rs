#[macro_use] extern crate log;
extern crate logsrv;

use std::process::exit;

use logsrv::adapters::{DirectCopyIn, InMemoryProcessTable, RealFilesystem, SystemClock};
use logsrv::config::Config;
use logsrv::error::ExitError;
use logsrv::handlers::Server;
use logsrv::transport::ChannelTransport;
use logsrv::{diag, dispatcher};

// Since `main` with a result currently insists on printing a message, but
// in our case we only get an `ExitError` if all is said and done, we make
// our own, more quiet version.
fn _main() -> Result<(), ExitError> {
    diag::init();

    let matches = Config::create_app().get_matches();
    let config = Config::from_arg_matches(&matches);

    if let Err(err) = diag::switch(config.verbose, config.log_file.as_deref()) {
        eprintln!("Fatal: cannot set up logging ({}). Aborting.", err);
        return Err(ExitError::Generic);
    }

    let mut server = Server::new(
        config.config_path,
        SystemClock,
        InMemoryProcessTable::new(),
        DirectCopyIn,
        RealFilesystem,
    );

    // `ChannelTransport` stands in for the kernel's IPC endpoint (out of
    // scope here, see SPEC_FULL.md §10). The returned sender is the
    // handle every request producer would clone from; in the real
    // system those producers live outside this crate entirely, so we
    // simply keep one clone alive for the lifetime of the dispatcher
    // loop rather than ever dropping it, matching the kernel transport's
    // blocking-forever behavior when no client is currently talking.
    let (transport, _producer) = ChannelTransport::new();

    info!("logging service starting up");
    dispatcher::run(&mut server, &transport);
    Ok(())
}

fn main() {
    match _main() {
        Ok(_) => exit(0),
        Err(ExitError::Generic) => exit(1),
        Err(ExitError::BadConfig) => exit(2),
    }
}
