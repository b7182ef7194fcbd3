// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Failed to open display: {0}")]
    DisplayUnavailable(String),
    #[error("Failed to create window: {0}")]
    WindowCreation(String),
    #[error("No window has been created")]
    NoWindow,
    #[error("A window is already open")]
    WindowExists,
    #[error("Display connection is closed")]
    DisplayClosed,
    #[error("Failed to present frame: {0}")]
    Presentation(String),
    #[error("Fullscreen request not honoured: {0}")]
    Fullscreen(String),
    #[error("Invalid surface geometry: {0}")]
    InvalidSurface(String),
    #[error("No audio device available: {0}")]
    AudioUnavailable(String),
    #[error("Audio stream failed: {0}")]
    AudioStream(String),
    #[error("Invalid audio spec: {0}")]
    InvalidAudioSpec(String),
    #[error("Audio is already open")]
    AudioAlreadyOpen,
    #[error("Failed to open WAV file {path}: {source}")]
    WavOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid WAV file: header shorter than 44 bytes")]
    WavHeaderTruncated,
    #[error("Failed to read WAV data: expected {expected} bytes, got {actual}")]
    WavDataTruncated { expected: u32, actual: usize },
    #[error("Failed to allocate {0} bytes for WAV data")]
    WavAllocation(u32),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
