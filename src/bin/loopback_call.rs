//! Runs a three-party call in one process over the in-memory signaling hub.
//! Takes an optional config path; without one, built-in defaults are used.

use std::{env, sync::Arc, time::Duration};

use rustycall::{
    config::{CallConfig, Config},
    core::{CallSession, MediaRequest, SessionEvent},
    log::{LogSink, logger::Logger},
    media_source_manager::FakeDevices,
    roster::Participant,
    signaling_client::LoopbackHub,
};

const SETTLE: Duration = Duration::from_millis(300);

fn main() {
    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => {
            println!("Loading config: {path}");
            Config::load(path).unwrap_or_else(|e| {
                eprintln!("Error loading config: {e}. Using defaults.");
                Config::empty()
            })
        }
        None => Config::empty(),
    };
    let base = CallConfig::from_config(&config).unwrap_or_else(|e| {
        eprintln!("Invalid config: {e}. Using defaults.");
        CallConfig::default()
    });

    let logger = Logger::start(&base.logging);
    let sink: Arc<dyn LogSink> = Arc::new(logger.handle());
    println!("Logging to {}", logger.file_path().display());

    let hub = LoopbackHub::new();
    let make = |name: &str| -> Option<CallSession> {
        let signaling = match hub.bind() {
            Ok(s) => s,
            Err(e) => {
                eprintln!("cannot bind {name}: {e}");
                return None;
            }
        };
        let cfg = CallConfig {
            display_name: name.to_owned(),
            ..base.clone()
        };
        Some(CallSession::new(
            Box::new(signaling),
            Box::new(FakeDevices::new()),
            cfg,
            Arc::clone(&sink),
        ))
    };

    let (Some(mut host), Some(mut ada), Some(mut bob)) = (make("Host"), make("Ada"), make("Bob"))
    else {
        return;
    };
    let tracks = MediaRequest::from(&base.media);

    let room = match host.start_as_host(tracks) {
        Ok(room) => room,
        Err(e) => {
            eprintln!("cannot host: {e}");
            return;
        }
    };
    println!("Hosting room {room}");

    if let Err(e) = ada.join_by_room_id(&room, tracks) {
        eprintln!("Ada cannot join: {e}");
        return;
    }
    settle(&mut [&mut host, &mut ada, &mut bob]);
    if let Err(e) = bob.join_by_room_id(&room, tracks) {
        eprintln!("Bob cannot join: {e}");
        return;
    }
    settle(&mut [&mut host, &mut ada, &mut bob]);
    print_rosters("after join", &[&host, &ada, &bob]);

    if let Err(e) = ada.send_chat("hello everyone") {
        eprintln!("chat failed: {e}");
    }
    if let Err(e) = bob.toggle_hand_raise() {
        eprintln!("hand raise failed: {e}");
    }
    settle(&mut [&mut host, &mut ada, &mut bob]);
    print_rosters("after chat and hand raise", &[&host, &ada, &bob]);

    let bob_id = bob.session_id().clone();
    if let Err(e) = host.host_mute(&bob_id) {
        eprintln!("host mute failed: {e}");
    }
    if let Err(e) = host.host_lower_hand(&bob_id) {
        eprintln!("lower hand failed: {e}");
    }
    if let Err(e) = ada.toggle_screen_share() {
        eprintln!("screen share failed: {e}");
    }
    settle(&mut [&mut host, &mut ada, &mut bob]);
    print_rosters("after moderation", &[&host, &ada, &bob]);

    for session in [&mut host, &mut ada, &mut bob] {
        session.end_call();
    }
    println!("Call ended");
}

/// Lets queued inputs flow between the sessions and prints what each saw.
fn settle(sessions: &mut [&mut CallSession]) {
    for _ in 0..3 {
        for session in sessions.iter_mut() {
            let name = session
                .local_participant()
                .map(|p| p.display_name.clone())
                .unwrap_or_default();
            for event in session.wait_events(SETTLE / 3) {
                print_event(&name, &event);
            }
        }
    }
}

fn print_event(name: &str, event: &SessionEvent) {
    match event {
        SessionEvent::RosterChanged(_) => {}
        SessionEvent::ChatReceived(msg) => {
            println!("  [{name}] chat from {}: {}", msg.sender, msg.content);
        }
        other => println!("  [{name}] {other:?}"),
    }
}

fn print_rosters(label: &str, sessions: &[&CallSession]) {
    println!("Rosters {label}:");
    for session in sessions {
        let entries: Vec<String> = session.roster().entries().iter().map(describe).collect();
        println!("  {} sees [{}]", session.session_id(), entries.join(", "));
    }
}

fn describe(p: &Participant) -> String {
    let mut flags = String::new();
    if p.is_host {
        flags.push('H');
    }
    if p.is_muted {
        flags.push('M');
    }
    if p.hand_raised {
        flags.push('R');
    }
    if flags.is_empty() {
        p.display_name.clone()
    } else {
        format!("{} ({flags})", p.display_name)
    }
}
