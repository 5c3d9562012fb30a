//! Sound effects
//!
//! On the web, effects are synthesized with the Web Audio API - no external
//! files needed. Browsers may refuse playback until a user gesture; every
//! failure is swallowed here and never reaches the game.

use crate::platform::SoundSink;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Two fruits merged
    Pop,
    /// Fruit released
    Drop,
    /// Run ended
    GameOver,
    /// Run ended with a new high score
    HighScore,
}

impl SoundEffect {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pop" => Some(SoundEffect::Pop),
            "drop" => Some(SoundEffect::Drop),
            "gameover" => Some(SoundEffect::GameOver),
            "highscore" => Some(SoundEffect::HighScore),
            _ => None,
        }
    }
}

/// Logs sounds instead of playing them (native builds)
#[derive(Debug, Default)]
pub struct LogSound {
    pub played: usize,
}

impl SoundSink for LogSound {
    fn play(&mut self, name: &str) {
        match SoundEffect::from_name(name) {
            Some(effect) => {
                self.played += 1;
                log::trace!("Sound: {:?}", effect);
            }
            None => log::debug!("Unknown sound {:?}", name),
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::SoundEffect;
    use crate::platform::SoundSink;

    /// Audio manager for the game
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        sfx_volume: f32,
    }

    impl AudioManager {
        pub fn new(sfx_volume: f32) -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                sfx_volume: sfx_volume.clamp(0.0, 1.0),
            }
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        fn play_effect(&self, effect: SoundEffect) {
            let vol = self.sfx_volume;
            if vol <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };

            // Autoplay policy: resume may be rejected until a gesture
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            match effect {
                SoundEffect::Pop => self.play_pop(ctx, vol),
                SoundEffect::Drop => self.play_drop(ctx, vol),
                SoundEffect::GameOver => self.play_game_over(ctx, vol),
                SoundEffect::HighScore => self.play_high_score(ctx, vol),
            }
        }

        /// Create an oscillator with gain envelope
        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// Pop - short upward chirp
        fn play_pop(&self, ctx: &AudioContext, vol: f32) {
            let Some((osc, gain)) = self.create_osc(ctx, 320.0, OscillatorType::Sine) else {
                return;
            };
            let t = ctx.current_time();

            gain.gain().set_value_at_time(vol * 0.5, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.12)
                .ok();
            osc.frequency().set_value_at_time(320.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(900.0, t + 0.08)
                .ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.14).ok();
        }

        /// Drop - soft low thump
        fn play_drop(&self, ctx: &AudioContext, vol: f32) {
            let Some((osc, gain)) = self.create_osc(ctx, 180.0, OscillatorType::Triangle) else {
                return;
            };
            let t = ctx.current_time();

            gain.gain().set_value_at_time(vol * 0.3, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.1)
                .ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(90.0, t + 0.1)
                .ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.12).ok();
        }

        /// Game over - descending tones
        fn play_game_over(&self, ctx: &AudioContext, vol: f32) {
            let t = ctx.current_time();
            for (i, freq) in [440.0, 370.0, 294.0].into_iter().enumerate() {
                if let Some((osc, gain)) = self.create_osc(ctx, freq, OscillatorType::Square) {
                    let start = t + i as f64 * 0.18;
                    gain.gain().set_value_at_time(0.0, t).ok();
                    gain.gain().set_value_at_time(vol * 0.15, start).ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.01, start + 0.3)
                        .ok();
                    osc.start_with_when(start).ok();
                    osc.stop_with_when(start + 0.32).ok();
                }
            }
        }

        /// High score - rising arpeggio
        fn play_high_score(&self, ctx: &AudioContext, vol: f32) {
            let t = ctx.current_time();
            for (i, freq) in [523.0, 659.0, 784.0, 1047.0].into_iter().enumerate() {
                if let Some((osc, gain)) = self.create_osc(ctx, freq, OscillatorType::Sine) {
                    let start = t + i as f64 * 0.1;
                    gain.gain().set_value_at_time(0.0, t).ok();
                    gain.gain().set_value_at_time(vol * 0.3, start).ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.01, start + 0.25)
                        .ok();
                    osc.start_with_when(start).ok();
                    osc.stop_with_when(start + 0.28).ok();
                }
            }
        }
    }

    impl SoundSink for AudioManager {
        fn play(&mut self, name: &str) {
            if let Some(effect) = SoundEffect::from_name(name) {
                self.play_effect(effect);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_effects() {
        assert_eq!(SoundEffect::from_name("pop"), Some(SoundEffect::Pop));
        assert_eq!(SoundEffect::from_name("highscore"), Some(SoundEffect::HighScore));
        assert_eq!(SoundEffect::from_name("kazoo"), None);

        let mut sink = LogSound::default();
        sink.play("pop");
        sink.play("kazoo");
        assert_eq!(sink.played, 1);
    }
}
