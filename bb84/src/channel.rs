//! Quantum channel models.
//!
//! The post-processing core only sees [`QuantumChannel::transmit`]. Any model
//! that honours its contract can stand in: a circuit simulator, hardware, or
//! the closed-form probabilistic models below.

use crate::bb84_states::{BB84State, BasisString, MeasurementBasis};
use crate::bits::BitString;
use crate::error::{QkdError, Result};
use crate::random::RandomSource;

pub trait QuantumChannel {
    /// Deliver `encoded` and measure position `i` in `measurement_bases[i]`.
    fn transmit<R: RandomSource + ?Sized>(
        &self,
        encoded: &[BB84State],
        measurement_bases: &BasisString,
        rng: &mut R,
    ) -> Result<BitString>;
}

fn check_probability(name: &str, p: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&p) {
        return Err(QkdError::InvalidArgument(format!(
            "{} must lie in [0, 1], got {}",
            name, p
        )));
    }
    Ok(p)
}

/// Independent bit-flip noise on each qubit in transit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoisyChannel {
    flip_probability: f64,
}

impl NoisyChannel {
    pub fn new(flip_probability: f64) -> Result<Self> {
        Ok(Self {
            flip_probability: check_probability("flip_probability", flip_probability)?,
        })
    }

    pub fn noiseless() -> Self {
        Self {
            flip_probability: 0.0,
        }
    }

    pub fn flip_probability(&self) -> f64 {
        self.flip_probability
    }
}

impl Default for NoisyChannel {
    fn default() -> Self {
        Self::noiseless()
    }
}

impl QuantumChannel for NoisyChannel {
    fn transmit<R: RandomSource + ?Sized>(
        &self,
        encoded: &[BB84State],
        measurement_bases: &BasisString,
        rng: &mut R,
    ) -> Result<BitString> {
        if encoded.len() != measurement_bases.len() {
            return Err(QkdError::length_mismatch(
                "channel measurement bases",
                encoded.len(),
                measurement_bases.len(),
            ));
        }
        Ok(encoded
            .iter()
            .zip(measurement_bases.iter())
            .map(|(&state, basis)| {
                let flip = self.flip_probability > 0.0 && rng.next_unit() < self.flip_probability;
                let state = if flip {
                    state.flipped()
                } else {
                    state
                };
                state.measure(basis, rng)
            })
            .collect())
    }
}

/// What an intercept-resend eavesdropper saw on the qubits it touched.
#[derive(Debug, Clone, Default)]
pub struct Interception {
    pub indices: Vec<usize>,
    pub bases: Vec<MeasurementBasis>,
    pub bits: Vec<bool>,
}

/// Eavesdropper in front of `inner`. Measures a fraction of the qubits in a
/// random basis and re-prepares the decoded bit in that same basis.
///
/// Intercepting every qubit produces a 25% error rate on the sifted key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterceptResend<C> {
    inner: C,
    intercept_fraction: f64,
}

impl<C: QuantumChannel> InterceptResend<C> {
    pub fn new(inner: C, intercept_fraction: f64) -> Result<Self> {
        Ok(Self {
            inner,
            intercept_fraction: check_probability("intercept_fraction", intercept_fraction)?,
        })
    }

    pub fn intercept_fraction(&self) -> f64 {
        self.intercept_fraction
    }

    /// Measure-and-resend step on its own. Returns the states forwarded to the
    /// receiver together with the eavesdropper's record.
    pub fn intercept<R: RandomSource + ?Sized>(
        &self,
        encoded: &[BB84State],
        rng: &mut R,
    ) -> (Vec<BB84State>, Interception) {
        let mut record = Interception::default();
        let forwarded = encoded
            .iter()
            .enumerate()
            .map(|(i, &state)| {
                if self.intercept_fraction <= 0.0 || rng.next_unit() >= self.intercept_fraction {
                    return state;
                }
                let basis = MeasurementBasis::random(rng);
                let bit = state.measure(basis, rng);
                record.indices.push(i);
                record.bases.push(basis);
                record.bits.push(bit);
                BB84State::prepare(bit, basis)
            })
            .collect();
        (forwarded, record)
    }
}

impl<C: QuantumChannel> QuantumChannel for InterceptResend<C> {
    fn transmit<R: RandomSource + ?Sized>(
        &self,
        encoded: &[BB84State],
        measurement_bases: &BasisString,
        rng: &mut R,
    ) -> Result<BitString> {
        let (forwarded, record) = self.intercept(encoded, rng);
        log::debug!(
            "intercept-resend touched {} of {} qubits",
            record.indices.len(),
            encoded.len()
        );
        self.inner.transmit(&forwarded, measurement_bases, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bb84_states::encode;
    use crate::random::seeded_source;
    use crate::sifting::sift;

    fn prepared(n: usize, seed: u64) -> (BitString, BasisString, BasisString) {
        let mut rng = seeded_source(seed);
        let bits = rng.generate_binary_array(n);
        let alice = rng.generate_bases(n);
        let bob = rng.generate_bases(n);
        (bits, alice, bob)
    }

    fn sifted_error_rate<C: QuantumChannel>(channel: &C, n: usize, seed: u64) -> f64 {
        let (bits, alice, bob) = prepared(n, seed);
        let mut rng = seeded_source(seed + 1);
        let states = encode(&bits, &alice).unwrap();
        let received = channel.transmit(&states, &bob, &mut rng).unwrap();
        let a = sift(&alice, &bob, &bits).unwrap();
        let b = sift(&alice, &bob, &received).unwrap();
        a.hamming_distance(&b).unwrap() as f64 / a.len() as f64
    }

    #[test]
    fn test_noiseless_channel_matches_on_shared_bases() {
        let rate = sifted_error_rate(&NoisyChannel::noiseless(), 2_000, 11);
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn test_noisy_channel_error_rate() {
        let channel = NoisyChannel::new(0.1).unwrap();
        let rate = sifted_error_rate(&channel, 20_000, 12);
        assert!(rate > 0.08 && rate < 0.12, "rate {}", rate);
    }

    #[test]
    fn test_full_intercept_resend_gives_quarter_errors() {
        let eve = InterceptResend::new(NoisyChannel::noiseless(), 1.0).unwrap();
        let rate = sifted_error_rate(&eve, 20_000, 13);
        assert!(rate > 0.23 && rate < 0.27, "rate {}", rate);
    }

    #[test]
    fn test_partial_intercept_scales_error_rate() {
        let eve = InterceptResend::new(NoisyChannel::noiseless(), 0.4).unwrap();
        let rate = sifted_error_rate(&eve, 20_000, 14);
        assert!(rate > 0.08 && rate < 0.12, "rate {}", rate);
    }

    #[test]
    fn test_interception_record_matches_touched_qubits() {
        let (bits, alice, _) = prepared(500, 15);
        let states = encode(&bits, &alice).unwrap();
        let eve = InterceptResend::new(NoisyChannel::noiseless(), 1.0).unwrap();
        let (forwarded, record) = eve.intercept(&states, &mut seeded_source(16));
        assert_eq!(record.indices.len(), 500);
        for (k, &i) in record.indices.iter().enumerate() {
            assert_eq!(forwarded[i].basis(), record.bases[k]);
            assert_eq!(forwarded[i].bit(), record.bits[k]);
            if record.bases[k] == alice.get(i).unwrap() {
                assert_eq!(record.bits[k], bits[i]);
            }
        }
    }

    #[test]
    fn test_rejects_bad_probabilities_and_lengths() {
        assert!(NoisyChannel::new(1.5).is_err());
        assert!(InterceptResend::new(NoisyChannel::noiseless(), -0.1).is_err());

        let states = vec![BB84State::QubitZero; 3];
        let bases = BasisString::new(vec![MeasurementBasis::Rectilinear; 2]);
        assert!(matches!(
            NoisyChannel::noiseless().transmit(&states, &bases, &mut seeded_source(0)),
            Err(QkdError::LengthMismatch { .. })
        ));
    }
}
