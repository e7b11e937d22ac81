use std::sync::mpsc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, warn};

use crate::error::AudioError;

/// Master volume applied to the mix
const MASTER_GAIN: f64 = 0.3;
/// Attack ramp length in seconds
const ATTACK_SECS: f64 = 0.05;
/// Level the release ramp decays to
const RELEASE_FLOOR: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    #[allow(dead_code)]
    Square,
}

impl Waveform {
    /// Sample the waveform at `phase`, measured in cycles.
    pub fn sample(self, phase: f64) -> f64 {
        let p = phase.fract();
        match self {
            Waveform::Sine => (p * 2.0 * std::f64::consts::PI).sin(),
            Waveform::Triangle => {
                if p < 0.25 {
                    4.0 * p
                } else if p < 0.75 {
                    2.0 - 4.0 * p
                } else {
                    4.0 * p - 4.0
                }
            }
            Waveform::Sawtooth => 2.0 * p - 1.0,
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// A single tone request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: f64,
    pub waveform: Waveform,
    pub seconds: f64,
    /// Start offset from the moment of the request
    pub delay: f64,
}

/// Sound output used by the game. Calls never fail and never block.
pub trait Audio {
    fn tone(&self, tone: Tone);

    fn play_tone(&self, frequency: f64, waveform: Waveform, seconds: f64) {
        self.tone(Tone {
            frequency,
            waveform,
            seconds,
            delay: 0.0,
        });
    }

    /// Two rising beeps.
    fn play_correct(&self) {
        self.play_tone(880.0, Waveform::Sine, 0.1);
        self.tone(Tone {
            frequency: 1100.0,
            waveform: Waveform::Sine,
            seconds: 0.2,
            delay: 0.1,
        });
    }

    /// Low buzz.
    fn play_incorrect(&self) {
        self.play_tone(150.0, Waveform::Sawtooth, 0.3);
    }
}

/// Discards every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Audio for Silent {
    fn tone(&self, _tone: Tone) {}
}

/// Envelope gain `t` seconds into a tone lasting `seconds`:
/// a linear attack, then an exponential fall to the release floor.
pub fn envelope(t: f64, seconds: f64) -> f64 {
    if t < 0.0 || t >= seconds {
        return 0.0;
    }
    let attack = ATTACK_SECS.min(seconds / 2.0);
    if t < attack {
        return t / attack;
    }
    let release = seconds - attack;
    RELEASE_FLOOR.powf((t - attack) / release)
}

struct Voice {
    tone: Tone,
    /// Samples still to wait before the tone starts
    wait: usize,
    /// Samples rendered so far
    elapsed: usize,
}

impl Voice {
    fn new(tone: Tone, sample_rate: f64) -> Self {
        Self {
            tone,
            wait: (tone.delay.max(0.0) * sample_rate) as usize,
            elapsed: 0,
        }
    }

    fn next(&mut self, sample_rate: f64) -> f64 {
        if self.wait > 0 {
            self.wait -= 1;
            return 0.0;
        }
        let t = self.elapsed as f64 / sample_rate;
        self.elapsed += 1;
        let phase = t * self.tone.frequency;
        self.tone.waveform.sample(phase) * envelope(t, self.tone.seconds)
    }

    fn finished(&self, sample_rate: f64) -> bool {
        self.wait == 0 && self.elapsed as f64 / sample_rate >= self.tone.seconds
    }
}

/// Tone mixer running on the default output device.
pub struct ToneEngine {
    tx: mpsc::Sender<Tone>,
    _stream: cpal::Stream,
}

impl ToneEngine {
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::Config(e.to_string()))?;

        let sample_rate = config.sample_rate() as f64;
        let channels = config.channels().max(1) as usize;

        let (tx, rx) = mpsc::channel::<Tone>();
        let mut voices: Vec<Voice> = Vec::new();

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    while let Ok(tone) = rx.try_recv() {
                        voices.push(Voice::new(tone, sample_rate));
                    }

                    for frame in data.chunks_mut(channels) {
                        let mut value = 0.0_f64;
                        for voice in voices.iter_mut() {
                            value += voice.next(sample_rate);
                        }
                        let out = (value * MASTER_GAIN).clamp(-1.0, 1.0) as f32;
                        for sample in frame.iter_mut() {
                            *sample = out;
                        }
                    }

                    voices.retain(|v| !v.finished(sample_rate));
                },
                move |err| {
                    warn!("audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Play(e.to_string()))?;
        debug!(sample_rate, channels, "audio output opened");

        Ok(Self {
            tx,
            _stream: stream,
        })
    }
}

impl Audio for ToneEngine {
    fn tone(&self, tone: Tone) {
        if self.tx.send(tone).is_err() {
            debug!("audio thread gone, tone dropped");
        }
    }
}

/// Open the output device, or fall back to silence.
pub fn open(mute: bool) -> Box<dyn Audio> {
    if mute {
        return Box::new(Silent);
    }
    match ToneEngine::new() {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            warn!("audio disabled: {}", e);
            Box::new(Silent)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Recorder;
    use super::*;

    #[test]
    fn test_waveform_shapes() {
        assert!((Waveform::Sine.sample(0.25) - 1.0).abs() < 1e-9);
        assert!(Waveform::Sine.sample(0.0).abs() < 1e-9);
        assert!((Waveform::Triangle.sample(0.25) - 1.0).abs() < 1e-9);
        assert!((Waveform::Triangle.sample(0.75) + 1.0).abs() < 1e-9);
        assert!((Waveform::Sawtooth.sample(0.0) + 1.0).abs() < 1e-9);
        assert_eq!(Waveform::Square.sample(1.25), 1.0);
        assert_eq!(Waveform::Square.sample(0.75), -1.0);
    }

    #[test]
    fn test_envelope() {
        assert_eq!(envelope(0.0, 0.3), 0.0);
        assert!((envelope(0.025, 0.3) - 0.5).abs() < 1e-9);
        assert!((envelope(0.05, 0.3) - 1.0).abs() < 1e-9);
        let tail = envelope(0.2999, 0.3);
        assert!(tail > 0.0 && tail < 0.01);
        assert_eq!(envelope(0.3, 0.3), 0.0);
        // very short tones still ramp up and down
        assert!(envelope(0.0005, 0.001) > 0.9);
    }

    #[test]
    fn test_voice_waits_for_delay() {
        let tone = Tone {
            frequency: 440.0,
            waveform: Waveform::Square,
            seconds: 0.01,
            delay: 0.001,
        };
        let mut v = Voice::new(tone, 1000.0);
        assert_eq!(v.next(1000.0), 0.0);
        assert!(!v.finished(1000.0));
        for _ in 0..10 {
            v.next(1000.0);
        }
        assert!(v.finished(1000.0));
    }

    #[test]
    fn test_feedback_jingles() {
        let rec = Recorder::default();
        rec.play_correct();
        rec.play_incorrect();
        let tones = rec.tones.borrow();
        assert_eq!(tones.len(), 3);
        assert_eq!(tones[0].frequency, 880.0);
        assert_eq!(tones[1].frequency, 1100.0);
        assert!((tones[1].delay - 0.1).abs() < 1e-9);
        assert_eq!(tones[2].waveform, Waveform::Sawtooth);
        assert_eq!(tones[2].frequency, 150.0);
    }

    #[test]
    fn test_muted_open_is_silent() {
        let audio = open(true);
        audio.play_correct();
    }
}
