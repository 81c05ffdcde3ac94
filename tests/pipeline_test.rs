// Library-level checks of the full file -> verdict path

use std::fs;
use std::path::PathBuf;

use cycle_check::analysis::ClipSpec;
use cycle_check::batch::BatchChecker;
use cycle_check::config::AppConfig;
use cycle_check::fixtures::{write_wav, ClickTrack, ToneSpec};
use cycle_check::CheckError;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "cycle_check_pipeline_{}_{}",
        std::process::id(),
        name
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn synthetic_clip_passes_end_to_end() {
    let dir = scratch_dir("e2e");
    let path = dir.join("clip_12_18.wav");
    let spec = ClipSpec::parse(&path).unwrap();
    let track = ClickTrack::for_clip(spec, 30.0, 35.0, 44_100);
    assert_eq!(track.onsets_ms, vec![35.0, 435.0, 1035.0]);
    write_wav(&path, &track.render(), 44_100).unwrap();

    let report = BatchChecker::new(&AppConfig::default())
        .check_file(&path)
        .unwrap();
    let (gap1, gap2) = report.measurement.onsets.gaps();
    assert!((gap1 - 400.0).abs() <= 6.0, "first gap {gap1}");
    assert!((gap2 - 600.0).abs() <= 6.0, "second gap {gap2}");
    assert!(report.passed());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn piano_like_clip_with_tone_tails_passes() {
    let dir = scratch_dir("tone");
    let path = dir.join("piano_9_21.wav");
    let spec = ClipSpec::parse(&path).unwrap();
    let samples = ClickTrack::for_clip(spec, 30.0, 35.0, 44_100)
        .with_tone(ToneSpec {
            frequency_hz: 330.0,
            amplitude: 0.4,
            decay_ms: 300.0,
        })
        .render();
    write_wav(&path, &samples, 44_100).unwrap();

    let report = BatchChecker::new(&AppConfig::default())
        .check_file(&path)
        .unwrap();
    assert_eq!(report.measurement.expected.first_gap_ms, 300);
    assert_eq!(report.measurement.expected.second_gap_ms, 700);
    assert!(report.passed(), "{}", report.format_line());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn stereo_int16_clip_at_other_rate_is_resampled() {
    let dir = scratch_dir("stereo");
    let path = dir.join("tones_12_18.wav");
    let spec = ClipSpec::parse(&path).unwrap();
    let mono = ClickTrack::for_clip(spec, 30.0, 35.0, 48_000).render();

    let wav_spec = hound::WavSpec {
        channels: 2,
        sample_rate: 48_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, wav_spec).unwrap();
    for sample in mono {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value).unwrap();
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();

    let report = BatchChecker::new(&AppConfig::default())
        .check_file(&path)
        .unwrap();
    assert!(report.passed(), "{}", report.format_line());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn malformed_name_is_rejected_before_loading() {
    let err = BatchChecker::new(&AppConfig::default())
        .check_file(std::path::Path::new("/nonexistent/take_final.wav"))
        .unwrap_err();
    assert!(matches!(err, CheckError::MalformedInput { .. }));
}
