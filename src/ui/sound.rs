/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink, scaled by
/// the volume from the options document.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

/// Every effect the game can trigger.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    DoorOpen,
    ArrowShot,
    ArrowHit,
    EnemyDeath,
    PlayerHurt,
    Pickup,
    ChargeStart,
    Explosion,
    PauseOpen,
    PauseClose,
}

impl Cue {
    pub const ALL: [Cue; 10] = [
        Cue::DoorOpen,
        Cue::ArrowShot,
        Cue::ArrowHit,
        Cue::EnemyDeath,
        Cue::PlayerHurt,
        Cue::Pickup,
        Cue::ChargeStart,
        Cue::Explosion,
        Cue::PauseOpen,
        Cue::PauseClose,
    ];

    #[cfg_attr(not(feature = "sound"), allow(dead_code))]
    fn index(self) -> usize {
        self as usize
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Cue;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    /// Pre-generated WAV buffers, one per cue.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: Vec<Arc<Vec<u8>>>,
        volume: f32,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "no audio output, running silent");
                    return None;
                }
            };
            let buffers = Cue::ALL.iter().map(|&c| Arc::new(make_wav(&generate(c)))).collect();
            Some(SoundEngine { _stream: stream, handle, buffers, volume: 1.0 })
        }

        /// 0.0 mutes without tearing down the output stream.
        pub fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
        }

        pub fn play(&self, cue: Cue) {
            if self.volume <= 0.0 {
                return;
            }
            let buf = &self.buffers[cue.index()];
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.set_volume(self.volume);
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    pub(super) fn generate(cue: Cue) -> Vec<f32> {
        match cue {
            Cue::DoorOpen => gen_sweep(180.0, 420.0, 0.18, 0.25),
            Cue::ArrowShot => gen_sweep(900.0, 500.0, 0.07, 0.18),
            Cue::ArrowHit => gen_noise_tone(300.0, 0.06, 0.3),
            Cue::EnemyDeath => gen_notes(&[392.0, 330.0, 262.0], 0.06, 0.28),
            Cue::PlayerHurt => gen_noise_tone(140.0, 0.2, 0.35),
            Cue::Pickup => gen_notes(&[1047.0, 1319.0, 1568.0], 0.045, 0.25),
            Cue::ChargeStart => gen_sweep(120.0, 260.0, 0.22, 0.3),
            Cue::Explosion => gen_noise_tone(60.0, 0.4, 0.45),
            Cue::PauseOpen => gen_notes(&[660.0, 880.0], 0.05, 0.2),
            Cue::PauseClose => gen_notes(&[880.0, 660.0], 0.05, 0.2),
        }
    }

    /// Linear pitch sweep with a fading envelope
    fn gen_sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.6);
                (phase * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Short square-ish arpeggio
    fn gen_notes(notes: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Noise burst over a low tone: hits, hurts, blasts
    fn gen_noise_tone(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * freq * TAU).sin();
                // Simple LCG noise
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(0.8);
                (tone * 0.4 + noise * 0.6) * env * volume
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn set_volume(&mut self, _volume: f32) {}
    pub fn play(&self, _cue: Cue) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_indices_are_dense() {
        for (i, c) in Cue::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[cfg(feature = "sound")]
    #[test]
    fn every_cue_encodes_to_a_pcm_wav() {
        for cue in Cue::ALL {
            let samples = inner::generate(cue);
            assert!(!samples.is_empty());
            assert!(samples.iter().all(|s| s.abs() <= 1.0));
            let wav = inner::make_wav(&samples);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(wav.len(), 44 + samples.len() * 2);
        }
    }
}
