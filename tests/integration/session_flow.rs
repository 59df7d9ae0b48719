//! End-to-end session behavior through the public controller and runner.

use crate::helpers::{drain_events, rig};
use breathline::session::{PreferenceStore, SessionRunner};
use breathline::{
    AmbienceProfile, AmbienceSetting, SessionConfig, SessionEvent, SessionState, VoiceProfile,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn session(technique: &str, secs: f64) -> SessionConfig {
    SessionConfig {
        technique_id: technique.into(),
        total_duration_secs: secs,
        ambience: AmbienceSetting::new(AmbienceProfile::Ocean, 0.25),
        voice: VoiceProfile::default(),
        narration_enabled: true,
    }
}

#[tokio::test]
async fn four_seven_eight_minute_narrates_every_boundary() {
    let mut rig = rig();
    let mut events = rig.controller.subscribe();
    rig.controller.start(session("4-7-8", 60.0)).await;

    for _ in 0..1_200 {
        rig.controller.tick(0.05).await;
    }
    assert_eq!(rig.controller.state(), SessionState::Complete);

    let spoken = rig.speech.spoken();
    assert_eq!(spoken.len(), 10);
    assert_eq!(
        &spoken[..4],
        ["Inhale", "Hold", "Exhale", "Inhale"].map(String::from)
    );
    assert_eq!(spoken.last().map(String::as_str), Some("Inhale"));

    let state = rig.controller.sequencer().state();
    assert_eq!(state.phase_index, 0);
    assert!((state.phase_elapsed_secs - 3.0).abs() < 1e-6);

    let events = drain_events(&mut events);
    assert!(matches!(events.first(), Some(SessionEvent::Started { .. })));
    let entered = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::PhaseEntered { .. }))
        .count();
    assert_eq!(entered, 9);
    let record = match events.last() {
        Some(SessionEvent::Completed(Some(record))) => record.clone(),
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(record.cycles, 3);
    assert_eq!(record.pattern, "4-7-8");
    assert!(record.completed);

    let history = rig.log.load().unwrap();
    assert_eq!(history.records, vec![record]);
    assert_eq!(history.stats.total_sessions, 1);
    assert_eq!(history.stats.total_cycles, 3);

    let frames = rig.frames.frames();
    assert_eq!(frames.len(), 1_201);
    assert!(
        frames
            .windows(2)
            .all(|w| w[1].session_progress >= w[0].session_progress)
    );
    assert!(frames.last().unwrap().remaining_secs < 1e-6);
}

#[tokio::test]
async fn stopping_mid_session_records_partial_progress_once() {
    let mut rig = rig();
    rig.controller.start(session("box", 120.0)).await;
    rig.controller.tick(17.5).await;

    let record = rig.controller.stop().unwrap();
    assert!(!record.completed);
    assert_eq!(record.cycles, 1);
    assert!((record.duration_seconds - 17.5).abs() < 1e-9);
    assert!(rig.controller.stop().is_none());
    assert!(!rig.controller.synth().is_active());

    assert_eq!(rig.log.load().unwrap().records.len(), 1);
}

#[tokio::test]
async fn immediate_stop_leaves_history_untouched() {
    let mut rig = rig();
    rig.controller.start(session("sos", 60.0)).await;
    assert!(rig.controller.stop().is_none());
    assert!(!rig.log.path().exists());
}

#[tokio::test]
async fn pause_silences_narration_but_keeps_ambience() {
    let mut rig = rig();
    rig.controller.start(session("coherent", 60.0)).await;
    rig.controller.tick(2.0).await;
    let cancels_before = rig.speech.cancels();

    rig.controller.pause();
    assert!(rig.speech.cancels() > cancels_before);
    assert_eq!(
        rig.controller.synth().active_profile(),
        Some(AmbienceProfile::Ocean)
    );

    rig.controller.tick(30.0).await;
    assert!((rig.controller.progress() - 2.0 / 60.0).abs() < 1e-9);

    rig.controller.resume().await;
    rig.controller.tick(3.0).await;
    assert_eq!(rig.speech.spoken(), ["Inhale", "Inhale", "Exhale"]);
}

#[tokio::test]
async fn starting_a_session_remembers_choices() {
    let mut rig = rig();
    let mut config = session("coherent", 30.0);
    config.voice = VoiceProfile::parse_lossy("en-US-female");
    rig.controller.start(config).await;

    let saved = rig.preferences.load();
    assert_eq!(saved.last_technique.as_deref(), Some("coherent"));
    assert_eq!(saved.voice_profile, Some(VoiceProfile::parse_lossy("en-US-female")));
}

#[tokio::test]
async fn unknown_technique_runs_the_first_one() {
    let mut rig = rig();
    rig.controller.start(session("square", 30.0)).await;
    let technique = rig.controller.sequencer().technique().unwrap();
    assert_eq!(technique.id(), "box");
}

#[tokio::test(start_paused = true)]
async fn runner_drives_session_in_real_time() {
    let rig = rig();
    let log = rig.log.clone();
    let mut runner =
        SessionRunner::new(rig.controller).with_tick_interval(Duration::from_millis(100));
    let (_tx, rx) = tokio::sync::mpsc::channel(4);

    let record = runner
        .run(session("sos", 20.0), rx, CancellationToken::new())
        .await
        .unwrap();
    assert!(record.completed);
    assert_eq!(record.cycles, 2);
    assert_eq!(log.load().unwrap().stats.total_sessions, 1);
}

#[tokio::test(start_paused = true)]
async fn spawned_session_obeys_commands() {
    let rig = rig();
    let handle = SessionRunner::new(rig.controller)
        .with_tick_interval(Duration::from_millis(100))
        .spawn(session("4-7-8", 300.0));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(handle.pause().await);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(handle.resume().await);
    assert!(handle.set_volume(0.05).await);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(handle.stop().await);

    let (record, controller) = handle.finished().await.unwrap();
    let record = record.unwrap();
    assert!(!record.completed);
    assert!((9.5..=10.5).contains(&record.duration_seconds));
    assert!((controller.synth().volume() - 0.05).abs() < 1e-6);
    assert_eq!(controller.state(), SessionState::Idle);
}
