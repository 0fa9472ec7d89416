//! End-to-end feature extraction on synthesized WAV files

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use singerid_features::{FeatureConfig, FeatureError, FeatureExtractor};
use tempfile::tempdir;

fn write_sine_wav(path: &Path, sample_rate: u32, channels: u16, seconds: f32, freq: f32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let n = (sample_rate as f32 * seconds) as usize;
    for i in 0..n {
        let t = i as f32 / sample_rate as f32;
        let value = ((2.0 * PI * freq * t).sin() * 0.5 * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(value).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_sine_wav_produces_tensor_and_image() {
    let dir = tempdir().unwrap();
    let audio = dir.path().join("sine.wav");
    let image = dir.path().join("sine-spectrogram.jpg");
    write_sine_wav(&audio, 22050, 1, 3.0, 440.0);

    let extractor = FeatureExtractor::new(FeatureConfig::default()).unwrap();
    let tensor = extractor.audio_to_spectrogram(&audio, &image).unwrap();

    assert_eq!(tensor.shape(), [1, 128, 128, 3]);
    assert!(tensor.view().iter().all(|&v| (0.0..=1.0).contains(&v)));
    assert!(tensor.view().iter().any(|&v| v > 0.5), "tone should be bright");

    let written = std::fs::metadata(&image).unwrap();
    assert!(written.len() > 0);
}

#[test]
fn test_extraction_is_deterministic() {
    let dir = tempdir().unwrap();
    let audio = dir.path().join("tone.wav");
    write_sine_wav(&audio, 22050, 1, 1.5, 880.0);

    let extractor = FeatureExtractor::default();
    let first = extractor
        .audio_to_spectrogram(&audio, dir.path().join("a.jpg"))
        .unwrap();
    let second = extractor
        .audio_to_spectrogram(&audio, dir.path().join("b.jpg"))
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_stereo_44k_is_downmixed_and_resampled() {
    let dir = tempdir().unwrap();
    let audio = dir.path().join("stereo.wav");
    write_sine_wav(&audio, 44100, 2, 2.0, 300.0);

    let extractor = FeatureExtractor::default();
    let signal = extractor.load_audio(&audio).unwrap();
    assert_eq!(signal.sample_rate, 22050);
    assert_eq!(signal.len(), 44100);

    let tensor = extractor
        .audio_to_spectrogram(&audio, dir.path().join("stereo.jpg"))
        .unwrap();
    assert_eq!(tensor.shape(), [1, 128, 128, 3]);
}

#[test]
fn test_non_audio_file_is_decode_error() {
    let dir = tempdir().unwrap();
    let audio = dir.path().join("notes.mp3");
    std::fs::write(&audio, "definitely not an mp3 stream").unwrap();

    let err = FeatureExtractor::default()
        .audio_to_spectrogram(&audio, dir.path().join("x.jpg"))
        .unwrap_err();
    assert!(matches!(err, FeatureError::Decode(_)));
    assert!(!dir.path().join("x.jpg").exists());
}

#[test]
fn test_unwritable_image_path_is_io_error() {
    let dir = tempdir().unwrap();
    let audio = dir.path().join("sine.wav");
    write_sine_wav(&audio, 22050, 1, 0.5, 440.0);

    let err = FeatureExtractor::default()
        .audio_to_spectrogram(&audio, dir.path().join("missing").join("out.jpg"))
        .unwrap_err();
    assert!(err.is_io());
}

#[test]
fn test_mono_mp3_produces_tensor() {
    let dir = tempdir().unwrap();
    let audio = fixture("mono_22k.mp3");
    let image = dir.path().join("mono.jpg");

    let extractor = FeatureExtractor::default();
    let signal = extractor.load_audio(&audio).unwrap();
    assert_eq!(signal.sample_rate, 22050);
    assert!(
        (0.9..1.3).contains(&signal.duration_secs()),
        "decoded {:.3}s",
        signal.duration_secs()
    );

    let tensor = extractor.audio_to_spectrogram(&audio, &image).unwrap();
    assert_eq!(tensor.shape(), [1, 128, 128, 3]);
    assert!(tensor.view().iter().all(|&v| (0.0..=1.0).contains(&v)));
    assert!(std::fs::metadata(&image).unwrap().len() > 0);
}

#[test]
fn test_stereo_mp3_is_downmixed_and_resampled() {
    let dir = tempdir().unwrap();
    let audio = fixture("stereo_44k_silence.mp3");

    let extractor = FeatureExtractor::default();
    let signal = extractor.load_audio(&audio).unwrap();
    assert_eq!(signal.sample_rate, 22050);
    // 80 frames of 1152 samples at 44.1 kHz
    assert!(
        (1.9..2.2).contains(&signal.duration_secs()),
        "decoded {:.3}s",
        signal.duration_secs()
    );
    assert!(signal.samples.iter().all(|s| s.abs() < 1e-3));

    let tensor = extractor
        .audio_to_spectrogram(&audio, dir.path().join("stereo.jpg"))
        .unwrap();
    assert_eq!(tensor.shape(), [1, 128, 128, 3]);
    assert!(tensor.view().iter().all(|&v| (0.0..=1.0).contains(&v)));
}

#[test]
fn test_mp3_with_wav_name_is_decoded_by_content() {
    let dir = tempdir().unwrap();
    let extractor = FeatureExtractor::default();

    for name in ["mono_22k.mp3", "stereo_44k_silence.mp3"] {
        let original = fixture(name);
        let renamed = dir.path().join(name.replace(".mp3", ".wav"));
        std::fs::copy(&original, &renamed).unwrap();

        let expected = extractor.load_audio(&original).unwrap();
        let renamed_signal = extractor.load_audio(&renamed).unwrap();
        assert_eq!(renamed_signal, expected, "{} decoded differently", name);

        let a = extractor
            .audio_to_spectrogram(&original, dir.path().join("a.jpg"))
            .unwrap();
        let b = extractor
            .audio_to_spectrogram(&renamed, dir.path().join("b.jpg"))
            .unwrap();
        assert_eq!(a, b);
    }
}
