mod handler;
mod io;
mod protocol;

use std::io::{BufRead, BufReader, BufWriter, Write};

use crate::{
    cli::Args,
    core::{editor::Coercion, limits::RowLimit, session::Settings},
    error::AppResult,
};

use handler::BridgeHandler;
use io::NdjsonIo;
use protocol::BridgeRequest;

pub fn run(args: Args) -> AppResult<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;

    let settings = Settings {
        default_limit: RowLimit::from_count(args.default_limit),
        coercion: if args.strict_types {
            Coercion::Strict
        } else {
            Coercion::Lenient
        },
    };

    rt.block_on(async move {
        let mut handler = BridgeHandler::new(settings);
        if let Some(path) = &args.open {
            if let Err(e) = handler.preload(path).await {
                tracing::error!(path = %path.display(), error = %e, "failed to load database");
            }
        }

        let io = NdjsonIo::new(
            BufReader::new(std::io::stdin()),
            BufWriter::new(std::io::stdout()),
        );
        serve(io, &mut handler).await
    })
}

/// Reads requests until end of input, answering each one in order.
async fn serve<R: BufRead, W: Write>(mut io: NdjsonIo<R, W>, handler: &mut BridgeHandler) -> AppResult<()> {
    loop {
        let Some(line) = io.read_line()? else { break };
        if line.is_empty() {
            continue;
        }

        let req: BridgeRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                io.protocol_error(e.to_string())?;
                continue;
            }
        };

        tracing::debug!(id = %req.id, cmd = %req.cmd, "request");
        let resp = handler.handle(req).await;
        io.write_json_line(&resp)?;
    }

    tracing::info!("input closed; shutting down");
    Ok(())
}
