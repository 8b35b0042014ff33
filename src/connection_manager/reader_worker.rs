use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{RecvTimeoutError, Sender},
    },
    thread,
    time::Duration,
};

use crate::{
    connection_manager::{connection::ConnectionId, connection_error::ConnectionError},
    control_protocol::{codec, message::ControlMessage},
    core::events::EngineInput,
    log::LogSink,
    signaling_client::participant_id::ParticipantId,
    sink_debug, sink_trace, sink_warn,
    transport::ControlReceiver,
};

pub(super) struct ReaderArgs {
    pub conn: ConnectionId,
    pub remote: ParticipantId,
    pub receiver: ControlReceiver,
    pub run: Arc<AtomicBool>,
    pub events_tx: Sender<EngineInput>,
    pub logger: Arc<dyn LogSink>,
    pub poll: Duration,
}

/// Spawns the inbound loop of one connection.
///
/// Frames are decoded here, off the session thread. A frame that fails to
/// decode is logged and dropped; the connection stays up. Peer closure is
/// reported once as `TransportClosed` unless the connection was closed
/// locally first.
pub(super) fn spawn_reader(args: ReaderArgs) -> Result<(), ConnectionError> {
    let name = format!("conn-reader-{}", args.conn.as_u64());
    thread::Builder::new()
        .name(name)
        .spawn(move || run_reader(args))
        .map(|_| ())
        .map_err(|e| ConnectionError::Spawn(e.to_string()))
}

fn run_reader(args: ReaderArgs) {
    let ReaderArgs {
        conn,
        remote,
        receiver,
        run,
        events_tx,
        logger,
        poll,
    } = args;

    sink_debug!(logger, "[{conn}] reader started for {remote}");
    while run.load(Ordering::SeqCst) {
        match receiver.recv_timeout(poll) {
            Ok(frame) => match codec::decode(&frame) {
                Ok(ControlMessage::Unknown { kind, payload }) => {
                    sink_debug!(
                        logger,
                        "[{conn}] ignoring unknown control kind 0x{kind:02x} ({} bytes) from {remote}",
                        payload.len()
                    );
                }
                Ok(msg) => {
                    sink_trace!(logger, "[{conn}] <- {} from {remote}", msg.name());
                    let input = EngineInput::Control {
                        conn,
                        from: remote.clone(),
                        msg,
                    };
                    if events_tx.send(input).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    sink_warn!(
                        logger,
                        "[{conn}] dropping malformed control frame from {remote}: {e}"
                    );
                }
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if run.load(Ordering::SeqCst) {
                    sink_debug!(logger, "[{conn}] peer {remote} closed the control channel");
                    let _ = events_tx.send(EngineInput::TransportClosed { conn });
                }
                break;
            }
        }
    }
    sink_debug!(logger, "[{conn}] reader done");
}
