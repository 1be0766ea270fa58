//! Dubins path planner (C2).
//!
//! Computes the minimum-length path between two oriented configurations
//! under a minimum turning-radius constraint, evaluating all six canonical
//! families (LSL, LSR, RSL, RSR, RLR, LRL) in the normalised unit-radius
//! frame and returning the shortest feasible one. Pure and deterministic.

use std::f64::consts::PI;

/// An oriented 2D configuration: position plus heading in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Pose2D {
    #[must_use]
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }
}

/// One of the six canonical Dubins path families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DubinsPathType {
    Lsl,
    Lsr,
    Rsl,
    Rsr,
    Rlr,
    Lrl,
}

/// A feasible Dubins path: family plus the three normalised segment
/// lengths `(t, p, q)` and the real-world total length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DubinsPath {
    pub path_type: DubinsPathType,
    pub segment_lengths: (f64, f64, f64),
    pub total_length: f64,
}

fn mod2pi(theta: f64) -> f64 {
    let two_pi = 2.0 * PI;
    theta - two_pi * (theta / two_pi).floor()
}

struct Normalized {
    d: f64,
    alpha: f64,
    beta: f64,
}

fn normalize(start: Pose2D, goal: Pose2D, radius: f64) -> Normalized {
    let dx = goal.x - start.x;
    let dy = goal.y - start.y;
    let dist = (dx * dx + dy * dy).sqrt();
    let d = dist / radius;
    let theta = mod2pi(dy.atan2(dx));
    Normalized {
        d,
        alpha: mod2pi(start.theta - theta),
        beta: mod2pi(goal.theta - theta),
    }
}

fn lsl(n: &Normalized) -> Option<(f64, f64, f64)> {
    let (alpha, beta, d) = (n.alpha, n.beta, n.d);
    let p_sq = 2.0 + d * d - 2.0 * (alpha - beta).cos() + 2.0 * d * (alpha.sin() - beta.sin());
    if p_sq < 0.0 {
        return None;
    }
    let tmp1 = (beta.cos() - alpha.cos()).atan2(d + alpha.sin() - beta.sin());
    let t = mod2pi(-alpha + tmp1);
    let p = p_sq.sqrt();
    let q = mod2pi(beta - tmp1);
    Some((t, p, q))
}

fn rsr(n: &Normalized) -> Option<(f64, f64, f64)> {
    let (alpha, beta, d) = (n.alpha, n.beta, n.d);
    let p_sq = 2.0 + d * d - 2.0 * (alpha - beta).cos() + 2.0 * d * (beta.sin() - alpha.sin());
    if p_sq < 0.0 {
        return None;
    }
    let tmp1 = (alpha.cos() - beta.cos()).atan2(d - alpha.sin() + beta.sin());
    let t = mod2pi(alpha - tmp1);
    let p = p_sq.sqrt();
    let q = mod2pi(-beta + tmp1);
    Some((t, p, q))
}

fn lsr(n: &Normalized) -> Option<(f64, f64, f64)> {
    let (alpha, beta, d) = (n.alpha, n.beta, n.d);
    let p_sq = -2.0 + d * d + 2.0 * (alpha - beta).cos() + 2.0 * d * (alpha.sin() + beta.sin());
    if p_sq < 0.0 {
        return None;
    }
    let p = p_sq.sqrt();
    let tmp = (-alpha.cos() - beta.cos()).atan2(d + alpha.sin() + beta.sin()) - (-2.0_f64).atan2(p);
    let t = mod2pi(-alpha + tmp);
    let q = mod2pi(-mod2pi(beta) + tmp);
    Some((t, p, q))
}

fn rsl(n: &Normalized) -> Option<(f64, f64, f64)> {
    let (alpha, beta, d) = (n.alpha, n.beta, n.d);
    let p_sq = d * d - 2.0 + 2.0 * (alpha - beta).cos() - 2.0 * d * (alpha.sin() + beta.sin());
    if p_sq < 0.0 {
        return None;
    }
    let p = p_sq.sqrt();
    let tmp = (alpha.cos() + beta.cos()).atan2(d - alpha.sin() - beta.sin()) - 2.0_f64.atan2(p);
    let t = mod2pi(alpha - tmp);
    let q = mod2pi(beta - tmp);
    Some((t, p, q))
}

fn rlr(n: &Normalized) -> Option<(f64, f64, f64)> {
    let (alpha, beta, d) = (n.alpha, n.beta, n.d);
    let tmp = (6.0 - d * d + 2.0 * (alpha - beta).cos() + 2.0 * d * (alpha.sin() - beta.sin())) / 8.0;
    if tmp.abs() > 1.0 {
        return None;
    }
    let p = mod2pi(2.0 * PI - tmp.acos());
    let t = mod2pi(alpha - (alpha.cos() - beta.cos()).atan2(d - alpha.sin() + beta.sin()) + p / 2.0);
    let q = mod2pi(alpha - beta - t + p);
    Some((t, p, q))
}

fn lrl(n: &Normalized) -> Option<(f64, f64, f64)> {
    let (alpha, beta, d) = (n.alpha, n.beta, n.d);
    let tmp = (6.0 - d * d + 2.0 * (alpha - beta).cos() + 2.0 * d * (beta.sin() - alpha.sin())) / 8.0;
    if tmp.abs() > 1.0 {
        return None;
    }
    let p = mod2pi(2.0 * PI - tmp.acos());
    let t = mod2pi(-alpha - (alpha.cos() - beta.cos()).atan2(d + alpha.sin() - beta.sin()) + p / 2.0);
    let q = mod2pi(beta - alpha - t + p);
    Some((t, p, q))
}

/// Compute the shortest feasible Dubins path between `start` and `goal`
/// under turning radius `radius`. Returns `None` only when `radius` is not
/// positive; every family is infeasible only in degenerate configurations
/// that cannot arise once `radius > 0` (at least one of the six always
/// solves).
#[must_use]
pub fn shortest_path(start: Pose2D, goal: Pose2D, radius: f64) -> Option<DubinsPath> {
    if radius <= 0.0 {
        return None;
    }

    let n = normalize(start, goal, radius);
    let families: [(DubinsPathType, fn(&Normalized) -> Option<(f64, f64, f64)>); 6] = [
        (DubinsPathType::Lsl, lsl),
        (DubinsPathType::Lsr, lsr),
        (DubinsPathType::Rsl, rsl),
        (DubinsPathType::Rsr, rsr),
        (DubinsPathType::Rlr, rlr),
        (DubinsPathType::Lrl, lrl),
    ];

    families
        .into_iter()
        .filter_map(|(path_type, solve)| {
            let (t, p, q) = solve(&n)?;
            let normalized_length = t + p + q;
            Some(DubinsPath {
                path_type,
                segment_lengths: (t, p, q),
                total_length: normalized_length * radius,
            })
        })
        .min_by(|a, b| a.total_length.total_cmp(&b.total_length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_has_length_equal_to_distance() {
        let start = Pose2D::new(0.0, 0.0, 0.0);
        let goal = Pose2D::new(4.0, 0.0, 0.0);
        let path = shortest_path(start, goal, 1.0).expect("feasible path");
        assert!((path.total_length - 4.0).abs() < 1e-6, "{path:?}");
        assert!((path.segment_lengths.0).abs() < 1e-6);
        assert!((path.segment_lengths.2).abs() < 1e-6);
        assert!(matches!(
            path.path_type,
            DubinsPathType::Lsl | DubinsPathType::Rsr
        ));
    }

    #[test]
    fn reversed_heading_still_feasible() {
        let start = Pose2D::new(0.0, 0.0, 0.0);
        let goal = Pose2D::new(2.0, 0.0, PI);
        let path = shortest_path(start, goal, 1.0).expect("feasible path");
        assert!(path.total_length > 0.0);
    }

    #[test]
    fn weak_optimality_against_naive_family_scan() {
        let start = Pose2D::new(1.0, 2.0, 0.3);
        let goal = Pose2D::new(-3.0, 5.0, 2.1);
        let radius = 1.5;
        let best = shortest_path(start, goal, radius).expect("feasible path");
        let n = normalize(start, goal, radius);
        let all: Vec<f64> = [lsl(&n), lsr(&n), rsl(&n), rsr(&n), rlr(&n), lrl(&n)]
            .into_iter()
            .flatten()
            .map(|(t, p, q)| (t + p + q) * radius)
            .collect();
        let min_len = all.into_iter().fold(f64::INFINITY, f64::min);
        assert!((best.total_length - min_len).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_positive_radius() {
        let start = Pose2D::new(0.0, 0.0, 0.0);
        let goal = Pose2D::new(1.0, 1.0, 0.0);
        assert!(shortest_path(start, goal, 0.0).is_none());
    }
}
