//! Sequential request dispatcher (SPEC_FULL.md §4.E): blocks on receive,
//! validates, routes to a handler, replies. Never re-entered; one
//! request runs to completion before the next is received (§5).

use crate::adapters::{Clock, CopyIn, Filesystem, ProcessTable};
use crate::handlers::Server;
use crate::protocol::{validate_msg_len, validate_name, validate_severity, Request, Status};
use crate::transport::Transport;

/// Runs the dispatcher loop against `transport` until it reports no more
/// senders are live. Reply-send failures are logged and do not stop the
/// loop (§4.E, §7).
pub fn run<C, P, X, F, T>(server: &mut Server<C, P, X, F>, transport: &T)
where
    C: Clock,
    P: ProcessTable,
    X: CopyIn,
    F: Filesystem,
    T: Transport,
{
    while let Some(inbound) = transport.recv() {
        let source = inbound.envelope.source;
        let status = dispatch(server, source, inbound.envelope.request);
        inbound.reply_to.reply(status);
    }
}

/// Classifies and routes a single request, performing the dispatcher-
/// level validation (`EINVAL` for malformed arguments) before handing
/// off to the matching [`Server`] method.
fn dispatch<C, P, X, F>(server: &mut Server<C, P, X, F>, source: crate::registry::Endpoint, request: Request) -> Status
where
    C: Clock,
    P: ProcessTable,
    X: CopyIn,
    F: Filesystem,
{
    match request {
        Request::Initialize => match server.initialize() {
            Ok(()) => Status::Ok,
            Err(status) => status,
        },
        Request::StartLog { logger } => {
            if let Err(status) = validate_name(&logger) {
                return status;
            }
            server.start_log(&logger, source)
        }
        Request::CloseLog { logger } => {
            if let Err(status) = validate_name(&logger) {
                return status;
            }
            server.close_log(&logger, source)
        }
        Request::WriteLog { logger, severity, message } => {
            if let Err(status) = validate_name(&logger) {
                return status;
            }
            let severity = match validate_severity(severity) {
                Ok(s) => s,
                Err(status) => return status,
            };
            if let Err(status) = validate_msg_len(message.len()) {
                return status;
            }
            let msg_len = message.len();
            server.write_log(&logger, severity, &message, msg_len, source)
        }
        Request::SetSeverity { logger, severity } => {
            if let Err(status) = validate_name(&logger) {
                return status;
            }
            let severity = match validate_severity(severity) {
                Ok(s) => s,
                Err(status) => return status,
            };
            server.set_severity(&logger, severity)
        }
        Request::ClearLog { logger } => {
            if let Err(status) = validate_name(&logger) {
                return status;
            }
            server.clear_log(&logger)
        }
        Request::ClearAll => server.clear_all(),
    }
}
