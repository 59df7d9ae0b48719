//! Config, preferences, history and cue files on disk.

use crate::helpers::rig;
use breathline::audio::{NullOutput, write_wav_mono};
use breathline::narration::{CueLibrary, OutputCuePlayer, VoiceGender};
use breathline::session::{PreferenceStore, SessionLog};
use breathline::{
    AmbienceProfile, AmbienceSetting, BreathlineConfig, CueId, NarrationOutcome, Narrator,
    SessionConfig, VoiceProfile,
};

#[test]
fn config_file_supplies_session_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [session]
        technique = "sos"
        duration_secs = 120.0

        [ambience]
        profile = "forest"
        volume = 0.4

        [narration]
        enabled = false
        voice = "us-female"
        "#,
    )
    .unwrap();

    let config = BreathlineConfig::load_or_default(&path).unwrap();
    let session = SessionConfig::from_defaults(&config, None);
    assert_eq!(session.technique_id, "sos");
    assert_eq!(session.total_duration_secs, 120.0);
    assert_eq!(
        session.ambience,
        AmbienceSetting::new(AmbienceProfile::Forest, 0.4)
    );
    assert_eq!(session.voice, VoiceProfile::new(VoiceGender::Female, "en-US"));
    assert!(!session.narration_enabled);
}

#[test]
fn unknown_ambience_in_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[ambience]\nprofile = \"jungle\"\n").unwrap();
    assert!(BreathlineConfig::load_or_default(&path).is_err());
}

#[tokio::test]
async fn last_choices_seed_the_next_session() {
    let mut rig = rig();
    let mut config = SessionConfig::from_defaults(&BreathlineConfig::default(), None);
    config.technique_id = "box".into();
    config.voice = VoiceProfile::new(VoiceGender::Female, "en-GB");
    rig.controller.start(config).await;
    rig.controller.stop();

    let stored = rig.preferences.load();
    let next = SessionConfig::from_defaults(&BreathlineConfig::default(), Some(&stored));
    assert_eq!(next.technique_id, "box");
    assert_eq!(next.voice.gender, VoiceGender::Female);
}

#[tokio::test]
async fn history_accumulates_across_sessions_and_reopen() {
    let mut rig = rig();
    let mut config = SessionConfig::from_defaults(&BreathlineConfig::default(), None);
    config.technique_id = "coherent".into();
    config.total_duration_secs = 30.0;

    rig.controller.start(config.clone()).await;
    rig.controller.tick(12.0).await;
    rig.controller.stop();

    rig.controller.start(config).await;
    for _ in 0..31 {
        rig.controller.tick(1.0).await;
    }

    let reopened = SessionLog::new(rig.log.path());
    let history = reopened.load().unwrap();
    assert_eq!(history.records.len(), 2);
    assert!(!history.records[0].completed);
    assert!(history.records[1].completed);
    assert_ne!(history.records[0].session_id, history.records[1].session_id);
    assert_eq!(history.stats.total_cycles, 1 + 3);
    assert!((history.stats.total_minutes - 42.0 / 60.0).abs() < 1e-9);
}

#[tokio::test]
async fn recorded_cue_plays_without_host_speech() {
    let dir = tempfile::tempdir().unwrap();
    let voice = VoiceProfile::new(VoiceGender::Male, "en-GB");
    let cue_dir = dir.path().join(voice.cue_dir_name());
    write_wav_mono(&cue_dir.join("exhale.wav"), &[0.2; 2_400], 24_000).unwrap();

    let player = OutputCuePlayer::new(Box::new(NullOutput::new(48_000))).with_gain(0.8);
    let narrator = Narrator::builder(&Default::default())
        .cues(CueLibrary::new(dir.path()), Box::new(player))
        .build();

    assert_eq!(
        narrator.speak("Exhale", &voice).await,
        NarrationOutcome::Cue(CueId::Exhale)
    );
    assert_eq!(
        narrator.speak("Inhale", &voice).await,
        NarrationOutcome::Silent
    );
    let other = VoiceProfile::new(VoiceGender::Female, "en-GB");
    assert_eq!(
        narrator.speak("Exhale", &other).await,
        NarrationOutcome::Silent
    );
}
