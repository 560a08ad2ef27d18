//! Waveform generators
//!
//! Each simulation type maps to one pure function in [`WAVEFORM_TABLE`],
//! indexed by the enum discriminant. Functions see elapsed seconds since the
//! point was created, its immutable parameters and the random walk carry.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownSimulationType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationType {
    /// Slow sine drift around base
    #[default]
    #[serde(alias = "sine")]
    ConstantDrift = 0,
    /// 60 s ramp from min to max
    #[serde(alias = "ramp")]
    SawtoothRamp = 1,
    #[serde(alias = "random_walk")]
    BoundedRandomWalk = 2,
    #[serde(alias = "random_spike")]
    SpikingDrift = 3,
    RandomBinary = 4,
    /// Alternates min/max every 10 s
    #[serde(alias = "step")]
    DutyCycleStep = 5,
    #[serde(alias = "sawtooth")]
    PeriodicSawtooth = 6,
    #[serde(alias = "square_wave")]
    PeriodicSquare = 7,
    #[serde(alias = "triangle_wave")]
    PeriodicTriangle = 8,
    #[serde(alias = "pulse")]
    PeriodicPulse = 9,
}

impl SimulationType {
    pub const ALL: [SimulationType; 10] = [
        Self::ConstantDrift,
        Self::SawtoothRamp,
        Self::BoundedRandomWalk,
        Self::SpikingDrift,
        Self::RandomBinary,
        Self::DutyCycleStep,
        Self::PeriodicSawtooth,
        Self::PeriodicSquare,
        Self::PeriodicTriangle,
        Self::PeriodicPulse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConstantDrift => "constant_drift",
            Self::SawtoothRamp => "sawtooth_ramp",
            Self::BoundedRandomWalk => "bounded_random_walk",
            Self::SpikingDrift => "spiking_drift",
            Self::RandomBinary => "random_binary",
            Self::DutyCycleStep => "duty_cycle_step",
            Self::PeriodicSawtooth => "periodic_sawtooth",
            Self::PeriodicSquare => "periodic_square",
            Self::PeriodicTriangle => "periodic_triangle",
            Self::PeriodicPulse => "periodic_pulse",
        }
    }

    /// Level waveforms emit exact min/max values and skip ambient jitter
    pub fn is_discrete(&self) -> bool {
        waveform(*self).discrete
    }
}

impl fmt::Display for SimulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulationType {
    type Err = UnknownSimulationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim() {
            "constant_drift" | "sine" => Self::ConstantDrift,
            "sawtooth_ramp" | "ramp" => Self::SawtoothRamp,
            "bounded_random_walk" | "random_walk" => Self::BoundedRandomWalk,
            "spiking_drift" | "random_spike" => Self::SpikingDrift,
            "random_binary" => Self::RandomBinary,
            "duty_cycle_step" | "step" => Self::DutyCycleStep,
            "periodic_sawtooth" | "sawtooth" => Self::PeriodicSawtooth,
            "periodic_square" | "square_wave" => Self::PeriodicSquare,
            "periodic_triangle" | "triangle_wave" => Self::PeriodicTriangle,
            "periodic_pulse" | "pulse" => Self::PeriodicPulse,
            other => return Err(UnknownSimulationType(other.to_string())),
        };
        Ok(kind)
    }
}

/// Immutable waveform parameters of a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    pub base: f64,
    pub min: f64,
    pub max: f64,
    /// Jitter amplitude, also the random walk step size
    pub noise: f64,
    /// Period in seconds for the periodic waveforms, always positive
    pub period: f64,
    pub spike_chance: f64,
    pub spike_multiplier: f64,
    pub pulse_width: f64,
}

impl WaveParams {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Inputs to one waveform evaluation
#[derive(Debug, Clone, Copy)]
pub struct WaveInput<'a> {
    pub params: &'a WaveParams,
    /// Seconds since the point was created
    pub elapsed: f64,
    /// Previous clamped output of a random walk
    pub last_walk: f64,
}

pub type WaveFn = fn(&WaveInput<'_>, &mut dyn RngCore) -> f64;

pub struct Waveform {
    pub kind: SimulationType,
    pub discrete: bool,
    pub func: WaveFn,
}

/// Dispatch table, ordered by `SimulationType` discriminant
pub static WAVEFORM_TABLE: [Waveform; 10] = [
    Waveform {
        kind: SimulationType::ConstantDrift,
        discrete: false,
        func: constant_drift,
    },
    Waveform {
        kind: SimulationType::SawtoothRamp,
        discrete: false,
        func: sawtooth_ramp,
    },
    Waveform {
        kind: SimulationType::BoundedRandomWalk,
        discrete: false,
        func: bounded_random_walk,
    },
    Waveform {
        kind: SimulationType::SpikingDrift,
        discrete: false,
        func: spiking_drift,
    },
    Waveform {
        kind: SimulationType::RandomBinary,
        discrete: true,
        func: random_binary,
    },
    Waveform {
        kind: SimulationType::DutyCycleStep,
        discrete: true,
        func: duty_cycle_step,
    },
    Waveform {
        kind: SimulationType::PeriodicSawtooth,
        discrete: false,
        func: periodic_sawtooth,
    },
    Waveform {
        kind: SimulationType::PeriodicSquare,
        discrete: true,
        func: periodic_square,
    },
    Waveform {
        kind: SimulationType::PeriodicTriangle,
        discrete: false,
        func: periodic_triangle,
    },
    Waveform {
        kind: SimulationType::PeriodicPulse,
        discrete: true,
        func: periodic_pulse,
    },
];

pub fn waveform(kind: SimulationType) -> &'static Waveform {
    &WAVEFORM_TABLE[kind as usize]
}

/// Evaluate a waveform and add ambient jitter for continuous shapes
pub fn evaluate(kind: SimulationType, input: &WaveInput<'_>, rng: &mut dyn RngCore) -> f64 {
    let wave = waveform(kind);
    let value = (wave.func)(input, rng);
    if wave.discrete {
        value
    } else {
        value + jitter(rng, input.params.noise)
    }
}

/// Uniform sample in `[-amplitude, amplitude]`
pub fn jitter(rng: &mut dyn RngCore, amplitude: f64) -> f64 {
    let a = amplitude.abs();
    if a > 0.0 && a.is_finite() {
        rng.gen_range(-a..=a)
    } else {
        0.0
    }
}

fn constant_drift(input: &WaveInput<'_>, _rng: &mut dyn RngCore) -> f64 {
    let p = input.params;
    p.base + (input.elapsed / 30.0).sin() * p.range() * 0.05
}

fn sawtooth_ramp(input: &WaveInput<'_>, _rng: &mut dyn RngCore) -> f64 {
    let p = input.params;
    p.min + p.range() * ((input.elapsed % 60.0) / 60.0)
}

fn bounded_random_walk(input: &WaveInput<'_>, rng: &mut dyn RngCore) -> f64 {
    let p = input.params;
    let band = p.range() * 0.2;
    let mut step = jitter(rng, p.noise);
    if input.last_walk > p.base + band {
        step -= p.noise * 0.5;
    } else if input.last_walk < p.base - band {
        step += p.noise * 0.5;
    }
    input.last_walk + step
}

fn spiking_drift(input: &WaveInput<'_>, rng: &mut dyn RngCore) -> f64 {
    let p = input.params;
    let value = p.base + (input.elapsed / 60.0).sin() * p.range() * 0.1;
    if rng.gen::<f64>() < p.spike_chance {
        value * p.spike_multiplier
    } else {
        value
    }
}

fn random_binary(input: &WaveInput<'_>, rng: &mut dyn RngCore) -> f64 {
    let p = input.params;
    if rng.gen::<f64>() < p.spike_chance {
        p.max
    } else {
        p.min
    }
}

fn duty_cycle_step(input: &WaveInput<'_>, _rng: &mut dyn RngCore) -> f64 {
    let p = input.params;
    if ((input.elapsed / 10.0).floor() as i64) % 2 == 0 {
        p.min
    } else {
        p.max
    }
}

fn periodic_sawtooth(input: &WaveInput<'_>, _rng: &mut dyn RngCore) -> f64 {
    let p = input.params;
    p.min + p.range() * ((input.elapsed % p.period) / p.period)
}

fn periodic_square(input: &WaveInput<'_>, _rng: &mut dyn RngCore) -> f64 {
    let p = input.params;
    if input.elapsed % p.period < p.period / 2.0 {
        p.max
    } else {
        p.min
    }
}

fn periodic_triangle(input: &WaveInput<'_>, _rng: &mut dyn RngCore) -> f64 {
    let p = input.params;
    let phase = input.elapsed % p.period;
    let half = p.period / 2.0;
    if phase < half {
        p.min + p.range() * (phase / half)
    } else {
        p.max - p.range() * ((phase - half) / half)
    }
}

fn periodic_pulse(input: &WaveInput<'_>, _rng: &mut dyn RngCore) -> f64 {
    let p = input.params;
    if input.elapsed % p.period < p.pulse_width {
        p.max
    } else {
        p.min
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> WaveParams {
        WaveParams {
            base: 20.0,
            min: 0.0,
            max: 100.0,
            noise: 0.0,
            period: 4.0,
            spike_chance: 0.05,
            spike_multiplier: 1.5,
            pulse_width: 1.0,
        }
    }

    fn eval(kind: SimulationType, p: &WaveParams, elapsed: f64) -> f64 {
        let mut rng = StdRng::seed_from_u64(42);
        let input = WaveInput {
            params: p,
            elapsed,
            last_walk: p.base,
        };
        evaluate(kind, &input, &mut rng)
    }

    #[test]
    fn test_table_order_matches_enum() {
        for (idx, kind) in SimulationType::ALL.iter().enumerate() {
            assert_eq!(WAVEFORM_TABLE[idx].kind, *kind);
            assert_eq!(waveform(*kind).kind, *kind);
        }
    }

    #[test]
    fn test_parse_legacy_and_canonical_names() {
        assert_eq!(
            "sine".parse::<SimulationType>().unwrap(),
            SimulationType::ConstantDrift
        );
        assert_eq!(
            "triangle_wave".parse::<SimulationType>().unwrap(),
            SimulationType::PeriodicTriangle
        );
        for kind in SimulationType::ALL {
            assert_eq!(kind.as_str().parse::<SimulationType>().unwrap(), kind);
        }
        assert!("chaos".parse::<SimulationType>().is_err());

        let kind: SimulationType = serde_yaml::from_str("square_wave").unwrap();
        assert_eq!(kind, SimulationType::PeriodicSquare);
    }

    #[test]
    fn test_constant_drift_starts_at_base() {
        assert_eq!(eval(SimulationType::ConstantDrift, &params(), 0.0), 20.0);
    }

    #[test]
    fn test_ramp_is_sixty_second_sawtooth() {
        let p = params();
        assert_eq!(eval(SimulationType::SawtoothRamp, &p, 0.0), 0.0);
        assert_eq!(eval(SimulationType::SawtoothRamp, &p, 30.0), 50.0);
        assert_eq!(eval(SimulationType::SawtoothRamp, &p, 90.0), 50.0);
    }

    #[test]
    fn test_step_alternates_every_ten_seconds() {
        let p = params();
        assert_eq!(eval(SimulationType::DutyCycleStep, &p, 5.0), 0.0);
        assert_eq!(eval(SimulationType::DutyCycleStep, &p, 15.0), 100.0);
        assert_eq!(eval(SimulationType::DutyCycleStep, &p, 25.0), 0.0);
    }

    #[test]
    fn test_periodic_shapes() {
        let p = params();
        assert_eq!(eval(SimulationType::PeriodicSawtooth, &p, 1.0), 25.0);
        assert_eq!(eval(SimulationType::PeriodicSquare, &p, 1.0), 100.0);
        assert_eq!(eval(SimulationType::PeriodicSquare, &p, 3.0), 0.0);
        assert_eq!(eval(SimulationType::PeriodicTriangle, &p, 1.0), 50.0);
        assert_eq!(eval(SimulationType::PeriodicTriangle, &p, 2.0), 100.0);
        assert_eq!(eval(SimulationType::PeriodicTriangle, &p, 3.0), 50.0);
        assert_eq!(eval(SimulationType::PeriodicPulse, &p, 0.5), 100.0);
        assert_eq!(eval(SimulationType::PeriodicPulse, &p, 1.5), 0.0);
    }

    #[test]
    fn test_random_binary_hits_extremes_only() {
        let p = WaveParams {
            spike_chance: 0.5,
            ..params()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let input = WaveInput {
            params: &p,
            elapsed: 0.0,
            last_walk: 0.0,
        };
        let values: Vec<f64> = (0..200)
            .map(|_| evaluate(SimulationType::RandomBinary, &input, &mut rng))
            .collect();
        assert!(values.iter().all(|v| *v == 0.0 || *v == 100.0));
        assert!(values.contains(&0.0));
        assert!(values.contains(&100.0));
    }

    #[test]
    fn test_random_walk_pulls_back_toward_base() {
        let p = WaveParams {
            noise: 1.0,
            ..params()
        };
        let mut rng = StdRng::seed_from_u64(11);
        // 20% band above base is 40; from 90 the walk can only move down
        for _ in 0..100 {
            let input = WaveInput {
                params: &p,
                elapsed: 0.0,
                last_walk: 90.0,
            };
            let next = (WAVEFORM_TABLE[2].func)(&input, &mut rng);
            assert!(next <= 90.5);
        }
    }

    #[test]
    fn test_discrete_waveforms_skip_jitter() {
        let p = WaveParams {
            noise: 5.0,
            ..params()
        };
        assert_eq!(eval(SimulationType::PeriodicSquare, &p, 1.0), 100.0);
        assert!(SimulationType::PeriodicPulse.is_discrete());
        assert!(!SimulationType::ConstantDrift.is_discrete());
    }

    #[test]
    fn test_jitter_zero_amplitude() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(jitter(&mut rng, 0.0), 0.0);
        assert_eq!(jitter(&mut rng, f64::NAN), 0.0);
    }
}
