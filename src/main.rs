//! `shakedit` daemon: reads accelerometer samples, turns shakes into word
//! deletes and restores, and reports each edit as a JSON line.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;
use shakedit::clients::ClientList;
use shakedit::session::{apply_client_edits, shared_buffer};
use shakedit::{sensor, Classifier, Config, Session, SharedBuffer, WordBuffer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shake-to-edit gesture daemon.
#[derive(Parser)]
#[command(name = "shakedit", about = "Turn phone shakes into word deletes and restores")]
struct Args {
    /// Trigger level in g (overrides SHAKEDIT_THRESHOLD)
    #[arg(long)]
    threshold: Option<f64>,

    /// Minimum gap between gestures in ms (overrides SHAKEDIT_DEBOUNCE_MS)
    #[arg(long)]
    debounce_ms: Option<i64>,

    /// Unix socket to broadcast edits on (overrides SHAKEDIT_SOCKET)
    #[arg(long)]
    socket: Option<PathBuf>,

    /// JSON-lines sample file; stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Initial buffer text
    #[arg(long, default_value = "")]
    text: String,

    /// Initial cursor position in chars; end of text when omitted
    #[arg(long)]
    cursor: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shakedit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(debounce_ms) = args.debounce_ms {
        config.debounce_ms = debounce_ms;
    }
    if args.socket.is_some() {
        config.socket_path = args.socket.clone();
    }
    config.validate()?;

    let cursor = args.cursor.unwrap_or_else(|| args.text.chars().count());
    let buffer = shared_buffer(WordBuffer::with_value(args.text.clone(), cursor, cursor)?);

    let clients = ClientList::new();
    if let Some(path) = &config.socket_path {
        listen(path, clients.clone(), buffer.clone())?;
        info!("socket at {}", path.display());
    }

    // Sample source on a dedicated thread
    let input = match &args.input {
        Some(path) => Some(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => None,
    };
    let (tx, rx) = mpsc::channel();
    let source = thread::spawn(move || match input {
        Some(file) => sensor::start(BufReader::new(file), tx),
        None => sensor::start(io::stdin().lock(), tx),
    });

    info!(
        threshold = config.threshold,
        debounce_ms = config.debounce_ms,
        "waiting for shakes..."
    );

    let mut session = Session::new(
        Classifier::new(config.threshold, config.debounce_ms),
        buffer,
    );
    let mut stdout = io::stdout();
    session.run(rx, |dispatch| {
        let json = match serde_json::to_string(dispatch) {
            Ok(json) => json,
            Err(e) => {
                error!("failed to encode dispatch: {e}");
                return;
            }
        };

        info!(
            gesture = dispatch.gesture.as_str(),
            text = %dispatch.state.text,
            cursor = dispatch.state.cursor,
            "edit"
        );
        writeln!(stdout, "{json}").ok();
        stdout.flush().ok();

        clients.broadcast(&json);
    });

    if let Some(path) = &config.socket_path {
        let _ = std::fs::remove_file(path);
    }

    let delivered = source
        .join()
        .map_err(|_| anyhow!("sample source thread panicked"))??;
    info!(delivered, "done");
    Ok(())
}

/// Bind the broadcast socket and accept clients in the background. Each
/// client may also send `TextBufferState` JSON lines to replace the buffer.
fn listen(path: &Path, clients: ClientList, buffer: SharedBuffer) -> anyhow::Result<()> {
    // Clean up stale socket from previous run
    let _ = std::fs::remove_file(path);

    let listener = UnixListener::bind(path)
        .with_context(|| format!("failed to bind socket {}", path.display()))?;
    // Clients can rewrite the buffer, so only the owner may connect
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    listener.set_nonblocking(true)?;

    thread::spawn(move || loop {
        match listener.accept() {
            Ok((stream, _)) => {
                info!("client connected");
                stream.set_nonblocking(false).ok();
                match stream.try_clone() {
                    Ok(reader) => {
                        let buffer = buffer.clone();
                        thread::spawn(move || {
                            let applied = apply_client_edits(BufReader::new(reader), &buffer);
                            info!(applied, "client edit stream closed");
                        });
                    }
                    Err(e) => warn!("client stream not readable: {e}"),
                }
                if let Err(e) = clients.add(stream) {
                    warn!("failed to register client: {e}");
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(100));
            }
            Err(e) => {
                warn!("accept error: {e}");
                thread::sleep(Duration::from_millis(100));
            }
        }
    });

    Ok(())
}
