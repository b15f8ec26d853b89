//! Exchange feed adapters.
//!
//! One adapter per venue. Each owns a WebSocket connection, translates
//! venue frames into normalized BBO tuples and publishes them through
//! [`MarketMatrix::write_bbo`](crate::matrix::MarketMatrix::write_bbo).
//! Adapters never talk to each other; the matrix is their only shared
//! state. Venue quirks (envelope shape, subscribe frame, field names,
//! symbol-mapping direction) live in the venue file; everything around
//! them is the shared machinery in this module.

pub mod backpack;
pub mod edgex;
pub mod hyperliquid;
pub mod lighter;
pub mod zero_one;

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{connect_async_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};

use crate::error::{Error, Result};

pub use backpack::Backpack;
pub use edgex::EdgeX;
pub use hyperliquid::Hyperliquid;
pub use lighter::Lighter;
pub use zero_one::ZeroOne;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Read limit applied to every venue connection. Initial order-book
/// snapshots can be large; anything over this is a protocol violation
/// that surfaces as an error and restarts the connection.
pub const READ_LIMIT_BYTES: usize = 1 << 20;

/// A single venue feed. `connect` performs one full connection attempt:
/// dial, subscribe, then pump frames until the connection dies or the
/// shutdown signal flips.
#[async_trait]
pub trait FeedAdapter: Send + Sync {
    /// Venue name used in logs and supervision.
    fn name(&self) -> &'static str;

    /// One connection lifecycle. Returns `Ok(())` only when shutdown was
    /// observed; any transport failure is an `Err` for the supervisor to
    /// absorb and retry.
    async fn connect(&self, shutdown: watch::Receiver<bool>) -> Result<()>;
}

/// Dial a venue WebSocket with the shared read limit.
pub(crate) async fn dial(url: &str) -> Result<WsStream> {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(READ_LIMIT_BYTES);
    config.max_frame_size = Some(READ_LIMIT_BYTES);

    info!(url = %url, "connecting");
    let (ws, response) = connect_async_with_config(url, Some(config), false).await?;
    info!(status = %response.status(), "websocket connected");
    Ok(ws)
}

/// Pump frames until the connection dies or shutdown flips.
///
/// Text frames go to `on_frame`; the handler drops anything it cannot
/// use, so a malformed frame never ends the connection. Pings are
/// answered with pongs carrying the same payload. Server close and
/// transport errors return `Err` so the supervisor reconnects.
pub(crate) async fn read_loop<F>(
    mut ws: WsStream,
    mut shutdown: watch::Receiver<bool>,
    mut on_frame: F,
) -> Result<()>
where
    F: FnMut(&str),
{
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Ok(());
                }
            }
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    trace!(bytes = text.len(), "frame");
                    on_frame(&text);
                }
                Some(Ok(Message::Ping(data))) => {
                    trace!("ping");
                    ws.send(Message::Pong(data)).await?;
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(frame = ?frame, "closed by server");
                    return Err(Error::Connection("closed by server".into()));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(Error::Connection("stream ended".into())),
            }
        }
    }
}

/// Wall-clock nanoseconds since the epoch, the fallback event time for
/// venues that report none.
pub(crate) fn local_timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Venue event time in milliseconds to nanoseconds, substituting the
/// local clock when the venue reports nothing usable.
pub(crate) fn event_timestamp_ns(venue_ms: i64) -> u64 {
    if venue_ms > 0 {
        venue_ms as u64 * 1_000_000
    } else {
        local_timestamp_ns()
    }
}

/// Parse one top-of-book level from venue strings. Base-10 only; a
/// non-numeric or non-finite field rejects the level, which drops the
/// whole message upstream.
pub(crate) fn parse_level(price: &str, size: &str) -> Option<(f64, f64)> {
    let price: f64 = price.parse().ok()?;
    let size: f64 = size.parse().ok()?;
    (price.is_finite() && size.is_finite()).then_some((price, size))
}
