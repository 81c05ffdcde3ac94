// WindowedOnsetLocator - steepest-rise onset picking inside a time window
//
// The onset of a percussive hit is its attack edge, not its energy peak. The
// locator differentiates the onset envelope, smooths the derivative with a
// [0.25, 0.5, 0.25] kernel, and returns the time of the largest derivative
// among frames within `half_window_ms` of the requested center.
//
// When no frame falls inside the window the global derivative maximum is used
// instead, so the locator is total for every non-empty envelope.

use crate::analysis::envelope::{convolve_same, OnsetEnvelope};

const DERIVATIVE_KERNEL: [f32; 3] = [0.25, 0.5, 0.25];

/// Result of one windowed search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnsetPick {
    pub time_ms: f64,
    pub index: usize,
    /// False when the window was empty and the global maximum was used
    pub in_window: bool,
}

/// Locates onsets in one envelope; the smoothed derivative is computed once
pub struct WindowedOnsetLocator<'a> {
    envelope: &'a OnsetEnvelope,
    derivative: Vec<f32>,
}

impl<'a> WindowedOnsetLocator<'a> {
    pub fn new(envelope: &'a OnsetEnvelope) -> Self {
        let derivative = convolve_same(&gradient(envelope.values()), &DERIVATIVE_KERNEL);
        Self {
            envelope,
            derivative,
        }
    }

    /// Smoothed envelope derivative, one value per frame
    pub fn derivative(&self) -> &[f32] {
        &self.derivative
    }

    /// Time of the steepest rise within `|t - center_ms| <= half_window_ms`
    pub fn locate(&self, center_ms: f64, half_window_ms: f64) -> f64 {
        self.pick(center_ms, half_window_ms).time_ms
    }

    /// Like [`locate`](Self::locate), also reporting the frame and fallback use
    pub fn pick(&self, center_ms: f64, half_window_ms: f64) -> OnsetPick {
        let times = self.envelope.times_ms();
        let in_window = argmax(
            self.derivative
                .iter()
                .zip(times.iter())
                .enumerate()
                .filter(|(_, (_, &t))| (t - center_ms).abs() <= half_window_ms)
                .map(|(i, (&d, _))| (i, d)),
        );

        let (index, in_window) = match in_window {
            Some(index) => (index, true),
            None => {
                tracing::debug!(
                    "[Locator] No frames within {:.1} ms of {:.1} ms, using global maximum",
                    half_window_ms,
                    center_ms
                );
                let global = argmax(self.derivative.iter().copied().enumerate()).unwrap_or(0);
                (global, false)
            }
        };

        OnsetPick {
            time_ms: times[index],
            index,
            in_window,
        }
    }
}

/// Convenience wrapper for a single search on `envelope`
pub fn locate(envelope: &OnsetEnvelope, center_ms: f64, half_window_ms: f64) -> f64 {
    WindowedOnsetLocator::new(envelope).locate(center_ms, half_window_ms)
}

/// First index holding the largest value
fn argmax(values: impl Iterator<Item = (usize, f32)>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, value) in values {
        match best {
            Some((_, best_value)) if !(value > best_value) => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

/// Central differences inside, one-sided differences at both ends
fn gradient(values: &[f32]) -> Vec<f32> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let mut grad = Vec::with_capacity(n);
    grad.push(values[1] - values[0]);
    for i in 1..n - 1 {
        grad.push((values[i + 1] - values[i - 1]) / 2.0);
    }
    grad.push(values[n - 1] - values[n - 2]);
    grad
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(values: &[f32], frame_ms: f64) -> OnsetEnvelope {
        OnsetEnvelope::uniform(values.to_vec(), frame_ms).unwrap()
    }

    /// Envelope with step-like rises (attack edges) at the given frames
    fn steps(len: usize, rises: &[usize]) -> Vec<f32> {
        let mut values = vec![0.0f32; len];
        for &rise in rises {
            for (i, v) in values.iter_mut().enumerate().skip(rise) {
                // Rise then decay back to zero after 6 frames
                let age = i - rise;
                if age < 6 {
                    *v += [0.5, 1.0, 0.8, 0.5, 0.3, 0.1][age];
                }
            }
        }
        values
    }

    #[test]
    fn test_gradient_matches_edge_and_central_differences() {
        assert_eq!(gradient(&[1.0, 2.0, 4.0, 7.0]), vec![1.0, 1.5, 2.5, 3.0]);
        assert_eq!(gradient(&[5.0]), vec![0.0]);
        assert_eq!(gradient(&[1.0, 3.0]), vec![2.0, 2.0]);
    }

    #[test]
    fn test_argmax_prefers_first_of_ties() {
        let values = [1.0, 3.0, 3.0, 2.0];
        assert_eq!(argmax(values.iter().copied().enumerate()), Some(1));
        assert_eq!(argmax(std::iter::empty()), None);
    }

    #[test]
    fn test_locates_attack_edge_not_peak() {
        let env = envelope(&steps(40, &[10]), 10.0);
        let pick = WindowedOnsetLocator::new(&env).pick(100.0, 100.0);
        assert!(pick.in_window);
        // Envelope peak is at frame 11; steepest rise is at frame 10
        assert_eq!(pick.index, 10);
        assert_eq!(pick.time_ms, 100.0);
    }

    #[test]
    fn test_window_restricts_choice() {
        // Second hit is stronger, but the window only covers the first
        let mut values = steps(60, &[10]);
        for (v, extra) in values.iter_mut().zip(steps(60, &[40])) {
            *v += extra * 3.0;
        }
        let env = envelope(&values, 10.0);
        let locator = WindowedOnsetLocator::new(&env);

        assert_eq!(locator.locate(100.0, 50.0), 100.0);
        assert_eq!(locator.locate(400.0, 50.0), 400.0);
        assert_eq!(locator.locate(250.0, 1000.0), 400.0);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let env = envelope(&steps(40, &[10]), 10.0);
        // Window [100, 140] includes frame 10 exactly on its lower bound
        assert_eq!(locate(&env, 120.0, 20.0), 100.0);
    }

    #[test]
    fn test_empty_window_falls_back_to_global_maximum() {
        let env = envelope(&steps(40, &[25]), 10.0);
        let pick = WindowedOnsetLocator::new(&env).pick(10_000.0, 5.0);
        assert!(!pick.in_window);
        assert_eq!(pick.time_ms, 250.0);
    }

    #[test]
    fn test_total_for_tiny_envelopes() {
        for len in 1..5 {
            let env = envelope(&vec![0.0; len], 10.0);
            let t = locate(&env, -500.0, 1.0);
            assert_eq!(t, 0.0);
        }
        let env = envelope(&[0.7], 10.0);
        assert_eq!(locate(&env, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_non_uniform_times_are_respected() {
        let env = OnsetEnvelope::new(vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 3.0, 7.0, 20.0]).unwrap();
        // Frames at 3 ms and 7 ms tie; the earlier one wins
        assert_eq!(locate(&env, 5.0, 3.0), 3.0);
    }
}
