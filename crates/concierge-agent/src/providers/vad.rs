//! Local voice-activity gate.
//!
//! Segments incoming room audio into utterances by driving a four-state
//! machine (`Quiet → Starting → Speaking → Stopping → Quiet`) over 10 ms
//! PCM16 analysis windows. Per-window confidence is the normalized RMS
//! level; an exponentially smoothed volume must also clear the configured
//! floor before a window counts as speech.

use concierge_types::VadParams;

/// Analysis window length. 10 ms at any sample rate.
const WINDOW_MS: u32 = 10;

/// Exponential smoothing factor for the volume estimate.
const VOLUME_SMOOTHING: f64 = 0.2;

/// States of the speech gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Quiet,
    Starting,
    Speaking,
    Stopping,
}

/// Emitted when a transition completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    SpeechStarted,
    SpeechStopped,
}

/// Windowed voice-activity detector for PCM16 mono audio.
#[derive(Debug)]
pub struct SpeechGate {
    params: VadParams,
    state: GateState,
    sample_rate: u32,
    /// Bytes per 10 ms analysis window.
    window_bytes: usize,
    /// Consecutive speech windows required to confirm a start.
    start_windows: u32,
    /// Consecutive silent windows required to confirm a stop.
    stop_windows: u32,
    starting_count: u32,
    stopping_count: u32,
    pending: Vec<u8>,
    smoothed_volume: f64,
}

impl SpeechGate {
    pub fn new(params: VadParams, sample_rate: u32) -> Self {
        let window_samples = (sample_rate / (1000 / WINDOW_MS)).max(1);
        let window_secs = f64::from(window_samples) / f64::from(sample_rate.max(1));
        let start_windows = (params.start_secs / window_secs).round().max(1.0) as u32;
        let stop_windows = (params.stop_secs / window_secs).round().max(1.0) as u32;

        Self {
            params,
            state: GateState::Quiet,
            sample_rate,
            window_bytes: window_samples as usize * 2,
            start_windows,
            stop_windows,
            starting_count: 0,
            stopping_count: 0,
            pending: Vec::with_capacity(4096),
            smoothed_volume: 0.0,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// True while an utterance is in progress (including its trailing
    /// silence, which has not yet been confirmed as a stop).
    pub fn in_utterance(&self) -> bool {
        !matches!(self.state, GateState::Quiet)
    }

    /// Feeds PCM16 bytes and returns the transition completed by this
    /// chunk, if any.
    pub fn push(&mut self, pcm: &[u8]) -> Option<VadEvent> {
        self.pending.extend_from_slice(pcm);

        let mut event = None;
        while self.pending.len() >= self.window_bytes {
            let window: Vec<u8> = self.pending.drain(..self.window_bytes).collect();

            let confidence = rms_level(&window);
            self.smoothed_volume =
                self.smoothed_volume + VOLUME_SMOOTHING * (confidence - self.smoothed_volume);

            let speaking = confidence >= self.params.confidence
                && self.smoothed_volume >= self.params.min_volume;
            if let Some(completed) = self.step(speaking) {
                event = Some(completed);
            }
        }
        event
    }

    /// Returns the gate to `Quiet`, discarding buffered audio.
    pub fn reset(&mut self) {
        self.state = GateState::Quiet;
        self.starting_count = 0;
        self.stopping_count = 0;
        self.pending.clear();
        self.smoothed_volume = 0.0;
    }

    /// Advances the machine by one window.
    fn step(&mut self, speaking: bool) -> Option<VadEvent> {
        match (self.state, speaking) {
            (GateState::Quiet, true) => {
                self.state = GateState::Starting;
                self.starting_count = 1;
            }
            (GateState::Starting, true) => {
                self.starting_count += 1;
            }
            (GateState::Starting, false) => {
                self.state = GateState::Quiet;
                self.starting_count = 0;
            }
            (GateState::Speaking, false) => {
                self.state = GateState::Stopping;
                self.stopping_count = 1;
            }
            (GateState::Stopping, false) => {
                self.stopping_count += 1;
            }
            (GateState::Stopping, true) => {
                self.state = GateState::Speaking;
                self.stopping_count = 0;
            }
            (GateState::Quiet, false) | (GateState::Speaking, true) => {}
        }

        if self.state == GateState::Starting && self.starting_count >= self.start_windows {
            self.state = GateState::Speaking;
            self.starting_count = 0;
            return Some(VadEvent::SpeechStarted);
        }
        if self.state == GateState::Stopping && self.stopping_count >= self.stop_windows {
            self.state = GateState::Quiet;
            self.stopping_count = 0;
            return Some(VadEvent::SpeechStopped);
        }
        None
    }
}

/// Normalized RMS level of a PCM16 window, in `[0.0, 1.0]`.
fn rms_level(window: &[u8]) -> f64 {
    let num_samples = window.len() / 2;
    if num_samples == 0 {
        return 0.0;
    }

    let mut sum_squares = 0.0f64;
    for chunk in window.chunks_exact(2) {
        let sample = f64::from(i16::from_le_bytes([chunk[0], chunk[1]]));
        sum_squares += sample * sample;
    }

    ((sum_squares / num_samples as f64).sqrt() / f64::from(i16::MAX)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn eager_params() -> VadParams {
        VadParams {
            confidence: 0.01,
            start_secs: 0.02,
            stop_secs: 0.02,
            min_volume: 0.01,
        }
    }

    #[test]
    fn silence_stays_quiet() {
        let mut gate = SpeechGate::new(eager_params(), 16_000);
        // 100 ms of silence.
        assert_eq!(gate.push(&pcm(&vec![0i16; 1600])), None);
        assert_eq!(gate.state(), GateState::Quiet);
        assert!(!gate.in_utterance());
    }

    #[test]
    fn sustained_speech_starts() {
        let mut gate = SpeechGate::new(eager_params(), 16_000);
        // 200 ms of loud audio.
        let event = gate.push(&pcm(&vec![i16::MAX / 2; 3200]));
        assert_eq!(event, Some(VadEvent::SpeechStarted));
        assert_eq!(gate.state(), GateState::Speaking);
        assert!(gate.in_utterance());
    }

    #[test]
    fn sustained_silence_stops() {
        let mut gate = SpeechGate::new(eager_params(), 16_000);
        gate.push(&pcm(&vec![i16::MAX / 2; 3200]));
        assert_eq!(gate.state(), GateState::Speaking);

        let event = gate.push(&pcm(&vec![0i16; 3200]));
        assert_eq!(event, Some(VadEvent::SpeechStopped));
        assert_eq!(gate.state(), GateState::Quiet);
    }

    #[test]
    fn short_blip_does_not_start() {
        let params = VadParams {
            confidence: 0.01,
            start_secs: 0.2,
            stop_secs: 0.2,
            min_volume: 0.01,
        };
        let mut gate = SpeechGate::new(params, 16_000);

        // One loud 10 ms window followed by silence: never confirms a start.
        assert_eq!(gate.push(&pcm(&vec![i16::MAX / 2; 160])), None);
        assert_eq!(gate.push(&pcm(&vec![0i16; 1600])), None);
        assert_eq!(gate.state(), GateState::Quiet);
    }

    #[test]
    fn brief_pause_does_not_stop() {
        let params = VadParams {
            confidence: 0.01,
            start_secs: 0.02,
            stop_secs: 0.5,
            min_volume: 0.01,
        };
        let mut gate = SpeechGate::new(params, 16_000);
        gate.push(&pcm(&vec![i16::MAX / 2; 3200]));
        assert_eq!(gate.state(), GateState::Speaking);

        // 20 ms pause, well under the 500 ms hold.
        assert_eq!(gate.push(&pcm(&vec![0i16; 320])), None);
        assert!(gate.in_utterance());

        // Speech resumes.
        gate.push(&pcm(&vec![i16::MAX / 2; 320]));
        assert_eq!(gate.state(), GateState::Speaking);
    }

    #[test]
    fn partial_windows_accumulate() {
        let mut gate = SpeechGate::new(eager_params(), 16_000);
        // Feed a 10 ms window in two 5 ms halves; the second completes it.
        let half = pcm(&vec![i16::MAX / 2; 80]);
        assert_eq!(gate.push(&half), None);
        assert_eq!(gate.state(), GateState::Quiet);
        gate.push(&half);
        assert_ne!(gate.state(), GateState::Quiet);
    }

    #[test]
    fn reset_returns_to_quiet() {
        let mut gate = SpeechGate::new(eager_params(), 16_000);
        gate.push(&pcm(&vec![i16::MAX / 2; 3200]));
        assert_eq!(gate.state(), GateState::Speaking);

        gate.reset();
        assert_eq!(gate.state(), GateState::Quiet);
        assert!(!gate.in_utterance());
    }

    #[test]
    fn rms_level_bounds() {
        assert_eq!(rms_level(&[]), 0.0);
        assert_eq!(rms_level(&pcm(&vec![0i16; 160])), 0.0);
        let full = rms_level(&pcm(&vec![i16::MAX; 160]));
        assert!(full > 0.99 && full <= 1.0);
    }
}
