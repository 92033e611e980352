// src/shutdown.rs
// SIGINT/SIGTERM handling: first signal stops the server, second exits the process

use futures_util::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::{Handle, Signals};
use std::io;

use crate::server::Stopper;

/// Install the signal listener. Dropping the returned handle does not
/// unregister it; call `Handle::close` for that.
pub fn watch_signals(stopper: Stopper) -> io::Result<Handle> {
    let signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();
    tokio::spawn(relay_signals(signals, stopper));
    Ok(handle)
}

async fn relay_signals(mut signals: Signals, stopper: Stopper) {
    let logger = crate::logger::get_logger();
    let mut stopping = false;

    while let Some(signal) = signals.next().await {
        match signal {
            SIGINT | SIGTERM if stopping => {
                logger.forced_exit();
                std::process::exit(130);
            }
            SIGINT | SIGTERM => {
                logger.stop_requested();
                stopping = true;
                // Keep listening while the stop is in progress.
                let stopper = stopper.clone();
                tokio::spawn(async move { stopper.stop().await });
            }
            _ => {}
        }
    }
}
