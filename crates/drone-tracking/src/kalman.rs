//! Constant-velocity Kalman filter (C5).
//!
//! State vector `s = [x, y, vx, vy]`. Matrices are fixed-size and stack
//! allocated (`nalgebra::SMatrix`) per the redesign note in spec §9: the
//! filter is tight and gains nothing from heap-allocated dynamic matrices.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Matrix4x2, Vector2, Vector4};

/// A single target's Kalman state.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    state: Vector4<f64>,
    covariance: Matrix4<f64>,
    /// Process-noise intensity (tunable `q` in §4.5).
    process_noise: f64,
    /// Measurement-noise variance (tunable `r` in §4.5).
    measurement_variance: f64,
}

impl KalmanFilter {
    /// `initialise(z)`: set state from the first measurement; `P <- 10*I`.
    #[must_use]
    pub fn initialise(z: (f64, f64), process_noise: f64, measurement_variance: f64) -> Self {
        Self {
            state: Vector4::new(z.0, z.1, 0.0, 0.0),
            covariance: Matrix4::identity() * 10.0,
            process_noise,
            measurement_variance,
        }
    }

    fn transition(dt: f64) -> Matrix4<f64> {
        Matrix4::new(
            1.0, 0.0, dt, 0.0, //
            0.0, 1.0, 0.0, dt, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Standard white-noise-acceleration process covariance, scaled by
    /// `dt` and the tunable intensity `q`.
    fn process_covariance(&self, dt: f64) -> Matrix4<f64> {
        let q = self.process_noise;
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;
        #[rustfmt::skip]
        let m = Matrix4::new(
            dt4 / 4.0, 0.0,       dt3 / 2.0, 0.0,
            0.0,       dt4 / 4.0, 0.0,       dt3 / 2.0,
            dt3 / 2.0, 0.0,       dt2,       0.0,
            0.0,       dt3 / 2.0, 0.0,       dt2,
        );
        m * q
    }

    fn observation() -> Matrix2x4<f64> {
        Matrix2x4::new(1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// `predict()`: `s <- F*s`; `P <- F*P*F^T + Q`.
    pub fn predict(&mut self, dt: f64) {
        let f = Self::transition(dt);
        let q = self.process_covariance(dt);
        self.state = f * self.state;
        self.covariance = f * self.covariance * f.transpose() + q;
    }

    /// `update(z)`: standard Kalman correction step.
    pub fn update(&mut self, z: (f64, f64)) {
        let h = Self::observation();
        let r = Matrix2::identity() * self.measurement_variance;
        let z = Vector2::new(z.0, z.1);

        let y = z - h * self.state;
        let s = h * self.covariance * h.transpose() + r;
        let Some(s_inv) = s.try_inverse() else {
            // Singular innovation covariance: skip the correction rather
            // than propagate NaNs into the track.
            return;
        };
        let k: Matrix4x2<f64> = self.covariance * h.transpose() * s_inv;

        self.state += k * y;
        self.covariance = (Matrix4::identity() - k * h) * self.covariance;
    }

    /// Mahalanobis distance of a candidate observation against this
    /// track's predicted position, used for nearest-neighbour gating.
    #[must_use]
    pub fn mahalanobis_distance(&self, z: (f64, f64)) -> f64 {
        let h = Self::observation();
        let r = Matrix2::identity() * self.measurement_variance;
        let z = Vector2::new(z.0, z.1);
        let y = z - h * self.state;
        let s = h * self.covariance * h.transpose() + r;
        let Some(s_inv) = s.try_inverse() else {
            return f64::INFINITY;
        };
        (y.transpose() * s_inv * y)[(0, 0)].max(0.0).sqrt()
    }

    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        (self.state[0], self.state[1])
    }

    #[must_use]
    pub fn velocity(&self) -> (f64, f64) {
        (self.state[2], self.state[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_to_true_velocity_with_noiseless_observations() {
        let mut filter = KalmanFilter::initialise((0.0, 0.0), 0.1, 0.01);
        let observations = [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)];
        for z in observations.into_iter().skip(1) {
            filter.predict(1.0);
            filter.update(z);
        }
        let (x, y) = filter.position();
        assert!((x - 3.0).abs() < 0.2, "x={x}");
        assert!(y.abs() < 0.2, "y={y}");
        let (vx, _vy) = filter.velocity();
        assert!((vx - 1.0).abs() < 0.2, "vx={vx}");
    }

    #[test]
    fn mahalanobis_distance_is_zero_at_predicted_position() {
        let mut filter = KalmanFilter::initialise((5.0, 5.0), 0.1, 1.0);
        filter.predict(1.0);
        let predicted = filter.position();
        assert!(filter.mahalanobis_distance(predicted) < 1e-6);
    }

    #[test]
    fn mahalanobis_distance_grows_with_displacement() {
        let mut filter = KalmanFilter::initialise((0.0, 0.0), 0.1, 1.0);
        filter.predict(1.0);
        let near = filter.mahalanobis_distance((0.1, 0.0));
        let far = filter.mahalanobis_distance((50.0, 50.0));
        assert!(far > near);
    }
}
