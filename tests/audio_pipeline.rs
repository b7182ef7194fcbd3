//! Audio pipeline and WAV loading through the public API.

use castaway_platform::audio::{
    AudioCallback, AudioFormat, AudioOutput, AudioSpec, HeadlessAudioDevice, RefillMode, SILENCE,
};
use castaway_platform::config::AudioConfig;
use castaway_platform::display::drivers::HeadlessDisplayDriver;
use castaway_platform::{Platform, PlatformConfig, PlatformError};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use test_log::test;

fn tiny() -> AudioConfig {
    AudioConfig {
        frequency: 8000,
        channels: 1,
        frames_per_buffer: 8,
    }
}

struct Counting {
    calls: Arc<AtomicUsize>,
    value: u8,
}

fn constant(state: &mut Counting, buf: &mut [u8]) {
    state.calls.fetch_add(1, Ordering::SeqCst);
    buf.fill(state.value);
}

fn pull_until(device: &HeadlessAudioDevice, len: usize, want: u8) -> Vec<u8> {
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut out = vec![0u8; len];
    loop {
        device.pull(&mut out);
        if out.iter().all(|&b| b == want) || Instant::now() > deadline {
            return out;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn it_should_start_with_silence_then_play_refilled_buffers() {
    let device = HeadlessAudioDevice::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let spec = AudioSpec::from_config(
        &tiny(),
        Some(constant as AudioCallback<Counting>),
        Counting {
            calls: Arc::clone(&calls),
            value: 200,
        },
    );
    let mut output = AudioOutput::open_with(&device, spec, RefillMode::Thread).unwrap();

    let mut primed = [0u8; 16];
    assert!(device.pull(&mut primed));
    assert_eq!(primed, [SILENCE; 16]);

    assert_eq!(pull_until(&device, 8, 200), vec![200; 8]);
    assert!(calls.load(Ordering::SeqCst) >= 1);

    output.close();
    assert!(!device.is_running());
}

#[test]
fn it_should_not_call_back_after_close() {
    let device = HeadlessAudioDevice::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let spec = AudioSpec::from_config(
        &tiny(),
        Some(constant as AudioCallback<Counting>),
        Counting {
            calls: Arc::clone(&calls),
            value: 1,
        },
    );
    let output = AudioOutput::open_with(&device, spec, RefillMode::Thread).unwrap();
    let mut out = [0u8; 64];
    device.pull(&mut out);
    drop(output);

    let after_close = calls.load(Ordering::SeqCst);
    assert!(!device.pull(&mut out));
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(calls.load(Ordering::SeqCst), after_close);
}

#[test]
fn it_should_play_silence_without_a_callback() {
    let device = HeadlessAudioDevice::new();
    let spec = AudioSpec::<()> {
        freq: 11025,
        format: AudioFormat::U8,
        channels: 2,
        frames_per_buffer: 16,
        callback: None,
        userdata: (),
    };
    let _output = AudioOutput::open_with(&device, spec, RefillMode::Thread).unwrap();
    let mut out = [0u8; 256];
    device.pull(&mut out);
    assert!(out.iter().all(|&b| b == SILENCE));
}

#[test]
fn it_should_fail_audio_independently_of_video() {
    let driver = HeadlessDisplayDriver::with_client_size(0, 0);
    let mut platform = Platform::with_driver(Box::new(driver), &PlatformConfig::default());
    platform.create_window("video", 8, 8, false).unwrap();

    let device = HeadlessAudioDevice::new();
    let bad = AudioSpec::<()> {
        freq: 0,
        format: AudioFormat::U8,
        channels: 1,
        frames_per_buffer: 8,
        callback: None,
        userdata: (),
    };
    let err = platform.open_audio_with(&device, bad, RefillMode::Thread).unwrap_err();
    assert!(matches!(err, PlatformError::InvalidAudioSpec(_)));
    assert!(platform.last_error().contains("Invalid audio spec"));
    assert!(platform.window().is_some());
}

fn temp_wav(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("castaway-{}-{}.wav", name, std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(bytes).unwrap();
    path
}

fn header(freq: u32, channels: u16, format: u16, data_len: u32) -> Vec<u8> {
    let mut h = vec![0u8; 44];
    h[0..4].copy_from_slice(b"RIFF");
    h[8..16].copy_from_slice(b"WAVEfmt ");
    h[22..24].copy_from_slice(&channels.to_le_bytes());
    h[24..28].copy_from_slice(&freq.to_le_bytes());
    h[34..36].copy_from_slice(&format.to_le_bytes());
    h[36..40].copy_from_slice(b"data");
    h[40..44].copy_from_slice(&data_len.to_le_bytes());
    h
}

#[test]
fn it_should_load_a_wav_file_from_disk() {
    let mut bytes = header(22050, 1, 8, 6);
    bytes.extend_from_slice(&[10, 20, 30, 40, 50, 60]);
    let path = temp_wav("ok", &bytes);

    let driver = HeadlessDisplayDriver::with_client_size(0, 0);
    let mut platform = Platform::with_driver(Box::new(driver), &PlatformConfig::default());
    let wav = platform.load_wav(&path).unwrap();
    assert_eq!(wav.spec.freq, 22050);
    assert_eq!(wav.spec.channels, 1);
    assert_eq!(wav.spec.format, 8);
    assert_eq!(wav.data, vec![10, 20, 30, 40, 50, 60]);
    let _ = std::fs::remove_file(path);
}

#[test]
fn it_should_fail_on_a_wav_with_half_its_payload() {
    let mut bytes = header(22050, 1, 8, 1000);
    bytes.extend(std::iter::repeat(128u8).take(500));
    let path = temp_wav("short", &bytes);

    let driver = HeadlessDisplayDriver::with_client_size(0, 0);
    let mut platform = Platform::with_driver(Box::new(driver), &PlatformConfig::default());
    let err = platform.load_wav(&path).unwrap_err();
    assert!(matches!(
        err,
        PlatformError::WavDataTruncated {
            expected: 1000,
            actual: 500
        }
    ));
    assert!(platform.last_error().contains("expected 1000 bytes, got 500"));
    let _ = std::fs::remove_file(path);
}

#[test]
fn it_should_fail_on_a_truncated_header_file() {
    let path = temp_wav("header", &header(8000, 1, 8, 0)[..20]);
    let err = castaway_platform::audio::load_wav(&path).unwrap_err();
    assert!(matches!(err, PlatformError::WavHeaderTruncated));
    let _ = std::fs::remove_file(path);
}
