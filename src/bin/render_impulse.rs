//! Renders the synthetic reverb kernel to a WAV file for offline listening.
//!
//! Usage: `render_impulse <out.wav> [sample_rate]`

use anyhow::{bail, Context};
use hound::{SampleFormat, WavSpec, WavWriter};
use page_audio_fx::{ImpulseResponseGenerator, ReverbConfig};

const DEFAULT_SAMPLE_RATE: u32 = 48_000;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: render_impulse <out.wav> [sample_rate]");
    };
    let sample_rate = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("invalid sample rate '{}'", raw))?,
        None => DEFAULT_SAMPLE_RATE,
    };

    let shape = ReverbConfig::default();
    let impulse = ImpulseResponseGenerator::new(sample_rate as f32)
        .decaying_noise(&shape)
        .context("failed to synthesise impulse response")?;

    let spec = WavSpec {
        channels: impulse.channel_count() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer =
        WavWriter::create(&path, spec).with_context(|| format!("cannot create {}", path))?;
    for frame in 0..impulse.len() {
        for channel in &impulse.channels {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;

    println!(
        "Wrote {} ({} ch, {} Hz, {:.2} s)",
        path,
        impulse.channel_count(),
        sample_rate,
        impulse.duration_seconds()
    );
    Ok(())
}
