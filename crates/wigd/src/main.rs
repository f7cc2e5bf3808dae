use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use futures::{SinkExt, StreamExt};
use glam::Mat4;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{error, info, warn};
use wig_core::config::{SimulationConfig, HISTORY_WINDOW_DEFAULT, SEGMENT_COUNT_DEFAULT};
use wig_core::io::frame::make_frame;
use wig_core::io::roots::RootSource;
use wig_core::profile::StrandProfile;
use wig_core::tick_once;
use wig_core::wig::Wig;

#[derive(Parser, Debug)]
#[command(name = "wigd", about = "Strand simulation streaming daemon")]
struct Args {
    /// Path to a root-point JSON document.
    #[arg(long, value_name = "PATH", conflicts_with = "sphere")]
    roots: Option<PathBuf>,

    /// UV sphere with N rings and 2N sectors, used when --roots is absent.
    #[arg(long, value_name = "N", default_value_t = 8)]
    sphere: u32,

    /// Optional profile JSON; defaults apply otherwise.
    #[arg(long, value_name = "PATH")]
    profile: Option<PathBuf>,

    /// Points per strand.
    #[arg(long, default_value_t = SEGMENT_COUNT_DEFAULT)]
    segments: usize,

    /// Seed for per-strand length variation.
    #[arg(long, default_value_t = 0)]
    seed: u32,

    /// Segments looked back when estimating the bend direction.
    #[arg(long, default_value_t = HISTORY_WINDOW_DEFAULT)]
    history: usize,

    /// Rotation of the source mesh about +Y, radians per second.
    #[arg(long, default_value_t = 0.5)]
    spin: f32,

    /// Address to bind (defaults to 127.0.0.1).
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on for WebSocket clients.
    #[arg(long, default_value_t = 8787)]
    port: u16,

    /// Milliseconds between ticks; also the simulated step length.
    #[arg(long, default_value_t = 16u64)]
    tick_ms: u64,
}

#[derive(Clone)]
struct AppState {
    tx: broadcast::Sender<String>,
}

fn build_wig(args: &Args) -> Result<Wig> {
    let source = match &args.roots {
        Some(path) => RootSource::File(path.clone()),
        None => RootSource::Sphere {
            rings: args.sphere,
            sectors: args.sphere * 2,
            radius: 0.5,
        },
    };
    let roots = source.load()?;

    let profile = match &args.profile {
        Some(path) => StrandProfile::load_from_path(path)
            .with_context(|| format!("failed to load profile from {:?}", path))?,
        None => StrandProfile::default(),
    };
    for issue in profile.validate() {
        warn!(%issue, "profile value outside its domain");
    }

    let config = SimulationConfig {
        segment_count: args.segments,
        seed: args.seed,
        history_window: args.history,
        ..SimulationConfig::default()
    };
    Wig::new(roots, config, profile)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();

    let wig = build_wig(&args)?;
    info!(
        strands = wig.store.vertex_count(),
        segments = wig.store.segment_count(),
        "wig ready"
    );

    let (tx, _rx) = broadcast::channel::<String>(16);
    let state = AppState { tx: tx.clone() };
    let wig_handle = Arc::new(Mutex::new(wig));

    // One tick in flight at a time: the ticker holds the lock for the whole step.
    let tick_tx = tx.clone();
    let tick_handle = Arc::clone(&wig_handle);
    let dt = args.tick_ms as f32 / 1_000.0;
    let spin = args.spin;
    let period = Duration::from_millis(args.tick_ms.max(1));
    tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            let tick_result: Result<(String, u64)> = {
                let mut wig = tick_handle.lock().await;
                let transform = Mat4::from_rotation_y(spin * (wig.time + dt));
                tick_once(&mut wig, transform, dt).and_then(|()| {
                    let frame = make_frame(wig.tick, wig.time, &wig.store, None);
                    Ok((frame.to_ndjson()?, wig.tick))
                })
            };

            let (line, t) = match tick_result {
                Ok(result) => result,
                Err(err) => {
                    error!(?err, "tick failed");
                    break;
                }
            };

            if tick_tx.send(line).is_err() {
                tracing::trace!("no subscribers for frame t={}", t);
            }
        }
    });

    let app = Router::new()
        .route("/stream", get(ws_handler))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.bind, args.port))?;

    info!(%addr, "starting wigd");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| async move { handle_socket(socket, state.tx.subscribe()).await })
}

async fn handle_socket(socket: WebSocket, mut rx: broadcast::Receiver<String>) {
    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Ok(line) => {
                    if sender.send(Message::Text(line)).await.is_err() {
                        error!("websocket client disconnected");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket client lagging, frames dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}
