pub mod orientation;
pub mod protocol;
pub mod stability;
pub mod types;
pub mod unwrap;

use anyhow::Result;
use protocol::{encode_parameters, ControlParameters, LineParser};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use types::SensorFrame;

/// Client for the sensor bridge.
///
/// Reads newline-delimited JSON samples, publishes the latest [`SensorFrame`],
/// and sends the current [`ControlParameters`] back at a fixed interval. The
/// background task is the only writer of the frame; the UI side is the only
/// writer of the parameters.
pub struct FeedClient {
    frame_rx: watch::Receiver<SensorFrame>,
    params_tx: watch::Sender<ControlParameters>,
    task: tokio::task::JoinHandle<()>,
}

impl FeedClient {
    /// Connect to the bridge over TCP and start processing.
    pub async fn connect(
        addr: &str,
        initial: ControlParameters,
        send_interval: Duration,
    ) -> Result<Self> {
        tracing::info!(%addr, "Connecting to sensor bridge");

        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        tracing::info!("Connected to sensor bridge");

        Ok(Self::spawn(stream, initial, send_interval))
    }

    /// Run the feed over an already established stream.
    pub fn spawn<S>(stream: S, initial: ControlParameters, send_interval: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (frame_tx, frame_rx) = watch::channel(SensorFrame::default());
        let (params_tx, params_rx) = watch::channel(initial);

        let task = tokio::spawn(feed_loop(stream, frame_tx, params_rx, send_interval));

        Self {
            frame_rx,
            params_tx,
            task,
        }
    }

    /// Create a mock client for development without the rig connected.
    ///
    /// The frame stays at its default; parameters are accepted and dropped.
    pub fn mock() -> Self {
        let (frame_tx, frame_rx) = watch::channel(SensorFrame::default());
        let (params_tx, _) = watch::channel(ControlParameters::default());
        let task = tokio::spawn(async move {
            // Keep the sender alive.
            let _tx = frame_tx;
            tokio::signal::ctrl_c().await.ok();
        });
        Self {
            frame_rx,
            params_tx,
            task,
        }
    }

    /// Latest frame (non-blocking, consistent copy).
    pub fn frame(&self) -> SensorFrame {
        *self.frame_rx.borrow()
    }

    /// Receiver for callers that want to await new frames.
    pub fn subscribe(&self) -> watch::Receiver<SensorFrame> {
        self.frame_rx.clone()
    }

    /// Replace the parameters sent on the next outbound tick.
    pub fn set_parameters(&self, params: ControlParameters) {
        self.params_tx.send_replace(params);
    }

    pub fn parameters(&self) -> ControlParameters {
        *self.params_tx.borrow()
    }

    /// Whether the background task has stopped (connection closed or failed).
    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FeedClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Background task: read samples, publish frames, send parameters periodically.
async fn feed_loop<S>(
    stream: S,
    frame_tx: watch::Sender<SensorFrame>,
    mut params_rx: watch::Receiver<ControlParameters>,
    send_interval: Duration,
) where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut parser = LineParser::new();
    let mut buf = [0u8; 4096];
    let mut frame = SensorFrame::default();
    let mut sample_count: u64 = 0;

    let mut ticker = tokio::time::interval(send_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            result = reader.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        tracing::warn!("Sensor bridge connection closed");
                        break;
                    }
                    Ok(n) => {
                        parser.push_data(&buf[..n]);

                        // Drain all complete lines; only the newest state is published.
                        let mut updated = false;
                        while let Some(result) = parser.next_sample() {
                            match result {
                                Ok(sample) => {
                                    frame.apply(&sample);
                                    updated = true;
                                    sample_count += 1;
                                    if sample_count % 1000 == 0 {
                                        tracing::debug!(sample_count, "Feed samples processed");
                                    }
                                }
                                Err(e) => {
                                    tracing::trace!(?e, "Skipping feed message");
                                }
                            }
                        }
                        if updated {
                            let _ = frame_tx.send(frame);
                        }
                    }
                    Err(e) => {
                        tracing::error!(?e, "Sensor bridge read error");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                let params = *params_rx.borrow_and_update();
                let line = match encode_parameters(&params) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!(?e, "Failed to encode control parameters");
                        continue;
                    }
                };
                if let Err(e) = writer.write_all(line.as_bytes()).await {
                    tracing::error!(?e, "Sensor bridge write error");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};

    const LINE: &str = "{\"q0\":1,\"q1\":0,\"q2\":0,\"q3\":0,\"x\":0.4,\"y\":0.1,\"CoG\":1,\"sessionID\":2,\"shotID\":5}\n";

    #[tokio::test]
    async fn publishes_decoded_frames() {
        let (client_side, mut bridge_side) = tokio::io::duplex(4096);
        let client = FeedClient::spawn(
            client_side,
            ControlParameters::default(),
            Duration::from_secs(3600),
        );
        let mut rx = client.subscribe();

        bridge_side.write_all(LINE.as_bytes()).await.unwrap();
        rx.changed().await.unwrap();

        let frame = client.frame();
        assert_eq!(frame.shot_id, 5);
        assert_eq!(frame.session_id, Some(2));
        assert_eq!(frame.cog_count, 1);
        assert!((frame.position.x - 0.4).abs() < 1e-12);
    }

    #[tokio::test]
    async fn malformed_lines_keep_last_frame() {
        let (client_side, mut bridge_side) = tokio::io::duplex(4096);
        let client = FeedClient::spawn(
            client_side,
            ControlParameters::default(),
            Duration::from_secs(3600),
        );
        let mut rx = client.subscribe();

        bridge_side.write_all(LINE.as_bytes()).await.unwrap();
        rx.changed().await.unwrap();

        let payload = format!("garbage\n{}", LINE.replace("\"shotID\":5", "\"shotID\":6"));
        bridge_side.write_all(payload.as_bytes()).await.unwrap();
        rx.changed().await.unwrap();

        let frame = client.frame();
        assert_eq!(frame.shot_id, 6);
        assert_eq!(frame.cog_count, 2);
    }

    #[tokio::test]
    async fn sends_parameters_on_tick() {
        let (client_side, bridge_side) = tokio::io::duplex(4096);
        let mut initial = ControlParameters::default();
        initial.sensitivity = 7.0;
        let _client = FeedClient::spawn(client_side, initial, Duration::from_millis(10));

        let mut lines = BufReader::new(bridge_side).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let params: ControlParameters = serde_json::from_str(&line).unwrap();
        assert_eq!(params.sensitivity, 7.0);
    }

    #[tokio::test]
    async fn mock_reports_default_frame() {
        let client = FeedClient::mock();
        assert_eq!(client.frame(), SensorFrame::default());
        client.set_parameters(ControlParameters::default());
    }
}
