// src/main.rs

//! Demo: a bouncing square, a square-wave tone toggled with M, Alt+Return
//! for fullscreen, Escape or closing the window to quit.

use anyhow::Context;
use castaway_platform::audio::AudioCallback;
use castaway_platform::{
    blit, fill_rect, logging, AudioSpec, KeyCode, Modifiers, Platform, PlatformEvent, Rect, Surface, CONFIG,
};
use log::{info, warn};

const FRAME_MS: u64 = 16;
const SPRITE: u32 = 32;

/// Square wave state handed to the audio callback.
struct Tone {
    phase: u32,
    period: u32,
}

fn square_wave(tone: &mut Tone, buf: &mut [u8]) {
    for sample in buf.iter_mut() {
        *sample = if tone.phase < tone.period / 2 {
            160
        } else {
            96
        };
        tone.phase = (tone.phase + 1) % tone.period;
    }
}

fn make_sprite() -> Surface<'static> {
    let mut sprite = Surface::new(SPRITE, SPRITE);
    // magenta corners are keyed out
    fill_rect(&mut sprite, None, 255, 0, 255, 255);
    fill_rect(&mut sprite, Some(Rect::new(4, 4, SPRITE - 8, SPRITE - 8)), 240, 200, 40, 255);
    sprite.set_color_key(255, 0, 255);
    sprite
}

fn main() -> anyhow::Result<()> {
    logging::init();
    info!("Starting castaway-demo...");

    let mut platform = Platform::init(&CONFIG).context("Failed to initialize platform")?;
    platform
        .create_configured_window()
        .context("Failed to create window")?;

    let freq = CONFIG.audio.frequency;
    let tone = Tone {
        phase: 0,
        period: (freq / 440).max(2),
    };
    let spec = AudioSpec::from_config(&CONFIG.audio, Some(square_wave as AudioCallback<Tone>), tone);
    if let Err(e) = platform.open_audio(spec) {
        warn!("Continuing without audio: {}", e);
    }
    let mut audio_paused = true;
    let _ = platform.pause_audio(audio_paused);

    let sprite = make_sprite();
    let (mut x, mut y, mut dx, mut dy) = (0i32, 0i32, 3i32, 2i32);

    'main: loop {
        let frame_start = platform.ticks();

        while let Some(event) = platform.poll_event() {
            match event {
                PlatformEvent::Quit
                | PlatformEvent::KeyDown {
                    key: KeyCode::Escape,
                    ..
                } => break 'main,
                PlatformEvent::KeyDown {
                    key: KeyCode::Return,
                    modifiers,
                } if modifiers.contains(Modifiers::LALT) => {
                    if let Some(window) = platform.window_mut() {
                        window.toggle_fullscreen();
                    }
                }
                PlatformEvent::KeyDown { key: KeyCode::M, .. } => {
                    audio_paused = !audio_paused;
                    platform.pause_audio(audio_paused).context("Failed to toggle audio")?;
                }
                _ => {}
            }
        }

        let Some(window) = platform.window_mut() else {
            break;
        };
        let (w, h) = (window.width() as i32, window.height() as i32);
        x += dx;
        y += dy;
        if x < 0 || x + SPRITE as i32 > w {
            dx = -dx;
            x += 2 * dx;
        }
        if y < 0 || y + SPRITE as i32 > h {
            dy = -dy;
            y += 2 * dy;
        }

        let surface = window.surface_mut();
        fill_rect(surface, None, 16, 24, 48, 255);
        blit(&sprite, None, surface, Some(Rect::new(x, y, 0, 0)));
        window.update().context("Failed to present frame")?;

        let elapsed = platform.ticks() - frame_start;
        if elapsed < FRAME_MS {
            platform.delay((FRAME_MS - elapsed) as u32);
        }
    }

    platform.shutdown();
    info!("castaway-demo exiting.");
    Ok(())
}
