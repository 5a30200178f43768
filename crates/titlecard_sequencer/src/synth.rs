// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swoosh synthesis.
//!
//! The transition cue is a triangle oscillator whose pitch rises
//! exponentially, filtered through a resonant band-pass biquad and shaped by
//! an exponential attack/decay envelope. Rendering is offline: one call
//! produces the whole voice as mono `f32` samples.

use std::f32::consts::PI;

/// Sample rate used for rendered voices
pub const SAMPLE_RATE: u32 = 48_000;

/// Total voice lifetime in seconds
pub const VOICE_SECONDS: f32 = 0.6;

/// Fixed parameters of the transition swoosh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwooshParams {
    /// Oscillator frequency at the start of the sweep (Hz)
    pub start_hz: f32,
    /// Oscillator frequency at the end of the sweep (Hz)
    pub end_hz: f32,
    /// Sweep length (s)
    pub sweep_seconds: f32,
    /// Band-pass center (Hz)
    pub filter_hz: f32,
    /// Band-pass resonance
    pub filter_q: f32,
    /// Envelope floor, used as start and end gain
    pub floor_gain: f32,
    /// Envelope peak gain
    pub peak_gain: f32,
    /// Time at which the peak is reached (s)
    pub attack_seconds: f32,
    /// Time at which the envelope is back at the floor (s)
    pub release_end_seconds: f32,
    /// Voice length (s)
    pub voice_seconds: f32,
}

/// The swoosh every scene transition plays
pub const SWOOSH: SwooshParams = SwooshParams {
    start_hz: 320.0,
    end_hz: 1240.0,
    sweep_seconds: 0.4,
    filter_hz: 900.0,
    filter_q: 12.0,
    floor_gain: 0.0001,
    peak_gain: 0.4,
    attack_seconds: 0.06,
    release_end_seconds: 0.55,
    voice_seconds: VOICE_SECONDS,
};

/// Value of an exponential ramp from `from` to `to` at fraction `t` of its length
fn exp_ramp(from: f32, to: f32, t: f32) -> f32 {
    from * (to / from).powf(t.clamp(0.0, 1.0))
}

impl SwooshParams {
    /// Oscillator frequency at time `t` seconds
    pub fn frequency_at(&self, t: f32) -> f32 {
        if t >= self.sweep_seconds {
            self.end_hz
        } else {
            exp_ramp(self.start_hz, self.end_hz, t / self.sweep_seconds)
        }
    }

    /// Envelope gain at time `t` seconds
    pub fn gain_at(&self, t: f32) -> f32 {
        if t <= self.attack_seconds {
            exp_ramp(self.floor_gain, self.peak_gain, t / self.attack_seconds)
        } else if t <= self.release_end_seconds {
            let span = self.release_end_seconds - self.attack_seconds;
            exp_ramp(self.peak_gain, self.floor_gain, (t - self.attack_seconds) / span)
        } else {
            self.floor_gain
        }
    }

    /// Number of samples in one voice at `sample_rate`
    pub fn sample_count(&self, sample_rate: u32) -> usize {
        (self.voice_seconds * sample_rate as f32).round() as usize
    }

    /// Render one voice as mono samples
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let dt = 1.0 / sample_rate as f32;
        let mut filter = BandPass::new(self.filter_hz, self.filter_q, sample_rate as f32);
        let mut phase = 0.0_f32;

        (0..self.sample_count(sample_rate))
            .map(|n| {
                let t = n as f32 * dt;
                let sample = triangle(phase);
                phase = (phase + self.frequency_at(t) * dt).fract();
                filter.process(sample) * self.gain_at(t)
            })
            .collect()
    }
}

/// Triangle wave for a phase in [0, 1), starting at zero and rising
fn triangle(phase: f32) -> f32 {
    let shifted = (phase + 0.25).fract();
    1.0 - 4.0 * (shifted - 0.5).abs()
}

/// Band-pass biquad with 0 dB peak gain (direct form I)
#[derive(Debug, Clone)]
pub struct BandPass {
    b0: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BandPass {
    /// Create a filter centered at `center_hz` with resonance `q`
    pub fn new(center_hz: f32, q: f32, sample_rate: f32) -> Self {
        let w0 = 2.0 * PI * center_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;

        Self {
            b0: alpha / a0,
            b2: -alpha / a0,
            a1: -2.0 * w0.cos() / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Filter one sample
    pub fn process(&mut self, x: f32) -> f32 {
        // b1 is zero for this response.
        let y = self.b0 * x + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn test_frequency_sweep() {
        assert!(approx(SWOOSH.frequency_at(0.0), 320.0, 0.01));
        assert!(approx(SWOOSH.frequency_at(0.4), 1240.0, 0.01));
        assert!(approx(SWOOSH.frequency_at(0.59), 1240.0, 0.01));
        // Exponential: the midpoint is the geometric mean.
        let mid = (320.0_f32 * 1240.0).sqrt();
        assert!(approx(SWOOSH.frequency_at(0.2), mid, 0.5));
    }

    #[test]
    fn test_envelope_shape() {
        assert!(approx(SWOOSH.gain_at(0.0), 0.0001, 1e-6));
        assert!(approx(SWOOSH.gain_at(0.06), 0.4, 1e-4));
        assert!(approx(SWOOSH.gain_at(0.55), 0.0001, 1e-6));
        assert!(approx(SWOOSH.gain_at(0.58), 0.0001, 1e-6));
        assert!(SWOOSH.gain_at(0.03) < SWOOSH.gain_at(0.05));
        assert!(SWOOSH.gain_at(0.2) > SWOOSH.gain_at(0.4));
    }

    #[test]
    fn test_render_length_and_bounds() {
        let samples = SWOOSH.render(SAMPLE_RATE);
        assert_eq!(samples.len(), 28_800);
        assert!(samples.iter().all(|s| s.is_finite() && s.abs() <= 1.0));

        let peak = samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.002, "swoosh should be audible, peak {peak}");
        // Tail is at the envelope floor.
        assert!(samples[samples.len() - 1].abs() < 0.001);
    }

    #[test]
    fn test_band_pass_rejects_dc() {
        let mut filter = BandPass::new(900.0, 12.0, SAMPLE_RATE as f32);
        let mut last = 0.0;
        for _ in 0..20_000 {
            last = filter.process(1.0);
        }
        assert!(last.abs() < 1e-3);
    }

    #[test]
    fn test_triangle_wave() {
        assert!(approx(triangle(0.0), 0.0, 1e-6));
        assert!(approx(triangle(0.25), 1.0, 1e-6));
        assert!(approx(triangle(0.5), 0.0, 1e-6));
        assert!(approx(triangle(0.75), -1.0, 1e-6));
    }
}
