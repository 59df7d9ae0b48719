//! Offline rendering of every ambience profile.

use breathline::AmbienceProfile;
use breathline::audio::{decode_to_mono_f32, render_to_vec, write_wav_mono};
use breathline::synth::{MasterGain, SignalGraph};
use rand::SeedableRng;
use rand::rngs::StdRng;

const RATE: u32 = 16_000;

fn render_at(profile: AmbienceProfile, rate: u32, seed: u64, secs: f32) -> Vec<f32> {
    let recipe = profile.recipe().unwrap();
    let mut graph = SignalGraph::build(
        &recipe,
        rate,
        0.5,
        MasterGain::new(1.0),
        &mut StdRng::seed_from_u64(seed),
    );
    render_to_vec(&mut graph, (secs * rate as f32) as usize)
}

fn render(profile: AmbienceProfile, seed: u64, secs: f32) -> Vec<f32> {
    render_at(profile, RATE, seed, secs)
}

#[test]
fn low_sample_rate_clamps_filters_and_stays_audible() {
    // At 8 kHz the spiritual 8 kHz high-pass sits above Nyquist.
    for profile in AmbienceProfile::ALL.into_iter().filter(|p| !p.is_none()) {
        let samples = render_at(profile, 8_000, 11, 2.0);
        assert!(
            samples.iter().all(|s| s.is_finite() && s.abs() <= 1.0),
            "{profile} out of range"
        );
        let rms = (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt();
        assert!(rms > 1e-3, "{profile} is silent (rms {rms})");
    }
}

#[test]
fn none_has_no_recipe() {
    assert!(AmbienceProfile::None.recipe().is_none());
}

#[test]
fn same_seed_renders_identically() {
    assert_eq!(
        render(AmbienceProfile::Rain, 5, 0.5),
        render(AmbienceProfile::Rain, 5, 0.5)
    );
}

#[test]
fn rendered_ambience_survives_a_wav_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preview").join("ocean.wav");
    let samples = render(AmbienceProfile::Ocean, 2, 1.0);
    write_wav_mono(&path, &samples, RATE).unwrap();

    let (decoded, rate) = decode_to_mono_f32(&path).unwrap();
    assert_eq!(rate, RATE);
    assert_eq!(decoded.len(), samples.len());
    let max_err = samples
        .iter()
        .zip(&decoded)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    assert!(max_err < 1e-3, "max error {max_err}");
}
