//! Segment and polygon math shared by cluster queries and topology.

use glam::{DVec2, DVec3};

/// Closest point to `point` on the segment `a`-`b`.
#[inline]
pub fn closest_point_on_segment(point: DVec3, a: DVec3, b: DVec3) -> DVec3 {
  let ab = b - a;
  let len_sq = ab.length_squared();
  if len_sq <= f64::EPSILON {
    return a;
  }
  let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
  a + ab * t
}

/// Squared distance from `point` to the segment `a`-`b`.
#[inline]
pub fn point_dist_to_segment_sq(point: DVec3, a: DVec3, b: DVec3) -> f64 {
  (point - closest_point_on_segment(point, a, b)).length_squared()
}

/// Closest pair of points between segments `a0`-`a1` and `b0`-`b1`.
pub fn segment_dist_to_segment(a0: DVec3, a1: DVec3, b0: DVec3, b1: DVec3) -> f64 {
  let d1 = a1 - a0;
  let d2 = b1 - b0;
  let r = a0 - b0;
  let a = d1.length_squared();
  let e = d2.length_squared();
  let f = d2.dot(r);

  let (s, t);
  if a <= f64::EPSILON && e <= f64::EPSILON {
    return r.length();
  }
  if a <= f64::EPSILON {
    s = 0.0;
    t = (f / e).clamp(0.0, 1.0);
  } else {
    let c = d1.dot(r);
    if e <= f64::EPSILON {
      t = 0.0;
      s = (-c / a).clamp(0.0, 1.0);
    } else {
      let b = d1.dot(d2);
      let denom = a * e - b * b;
      let s0 = if denom > f64::EPSILON {
        ((b * f - c * e) / denom).clamp(0.0, 1.0)
      } else {
        0.0
      };
      let t0 = (b * s0 + f) / e;
      if t0 < 0.0 {
        t = 0.0;
        s = (-c / a).clamp(0.0, 1.0);
      } else if t0 > 1.0 {
        t = 1.0;
        s = ((b - c) / a).clamp(0.0, 1.0);
      } else {
        t = t0;
        s = s0;
      }
    }
  }

  ((a0 + d1 * s) - (b0 + d2 * t)).length()
}

/// Signed area of a 2D polygon (positive when counter-clockwise).
pub fn signed_area(points: &[DVec2]) -> f64 {
  let n = points.len();
  if n < 3 {
    return 0.0;
  }
  let mut sum = 0.0;
  for i in 0..n {
    let a = points[i];
    let b = points[(i + 1) % n];
    sum += a.x * b.y - b.x * a.y;
  }
  sum * 0.5
}

/// Counter-clockwise angle rotating `from` onto `to`, in `[0, 2*PI)`.
#[inline]
pub fn ccw_angle(from: DVec2, to: DVec2) -> f64 {
  let angle = to.y.atan2(to.x) - from.y.atan2(from.x);
  if angle < 0.0 {
    angle + std::f64::consts::TAU
  } else {
    angle
  }
}

/// Perimeter of a closed 2D polygon.
pub fn perimeter(points: &[DVec2]) -> f64 {
  let n = points.len();
  if n < 2 {
    return 0.0;
  }
  let mut sum = 0.0;
  for i in 0..n {
    sum += (points[(i + 1) % n] - points[i]).length();
  }
  sum
}

/// True when the polygon has no reflex vertex.
pub fn is_convex(points: &[DVec2]) -> bool {
  let n = points.len();
  if n < 4 {
    return true;
  }
  let mut sign = 0.0f64;
  for i in 0..n {
    let a = points[i];
    let b = points[(i + 1) % n];
    let c = points[(i + 2) % n];
    let cross = (b - a).perp_dot(c - b);
    if cross.abs() > f64::EPSILON {
      if sign != 0.0 && cross.signum() != sign {
        return false;
      }
      sign = cross.signum();
    }
  }
  true
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_closest_point_on_segment() {
    let a = DVec3::ZERO;
    let b = DVec3::new(10.0, 0.0, 0.0);
    assert_eq!(
      closest_point_on_segment(DVec3::new(5.0, 3.0, 0.0), a, b),
      DVec3::new(5.0, 0.0, 0.0)
    );
    // Clamped to endpoints
    assert_eq!(closest_point_on_segment(DVec3::new(-5.0, 1.0, 0.0), a, b), a);
    assert_eq!(closest_point_on_segment(DVec3::new(15.0, 1.0, 0.0), a, b), b);
  }

  #[test]
  fn test_point_dist_to_segment_sq() {
    let a = DVec3::ZERO;
    let b = DVec3::new(10.0, 0.0, 0.0);
    let d = point_dist_to_segment_sq(DVec3::new(5.0, 4.0, 0.0), a, b);
    assert!((d - 16.0).abs() < 1e-12);
  }

  #[test]
  fn test_segment_dist_parallel() {
    let d = segment_dist_to_segment(
      DVec3::ZERO,
      DVec3::new(10.0, 0.0, 0.0),
      DVec3::new(0.0, 3.0, 0.0),
      DVec3::new(10.0, 3.0, 0.0),
    );
    assert!((d - 3.0).abs() < 1e-12);
  }

  #[test]
  fn test_signed_area_winding() {
    let ccw = [
      DVec2::new(0.0, 0.0),
      DVec2::new(1.0, 0.0),
      DVec2::new(1.0, 1.0),
      DVec2::new(0.0, 1.0),
    ];
    assert!((signed_area(&ccw) - 1.0).abs() < 1e-12);
    let cw: Vec<_> = ccw.iter().rev().copied().collect();
    assert!((signed_area(&cw) + 1.0).abs() < 1e-12);
  }

  #[test]
  fn test_ccw_angle() {
    let x = DVec2::X;
    let y = DVec2::Y;
    assert!((ccw_angle(x, y) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    assert!((ccw_angle(y, x) - 3.0 * std::f64::consts::FRAC_PI_2).abs() < 1e-12);
  }

  #[test]
  fn test_is_convex() {
    let square = [
      DVec2::new(0.0, 0.0),
      DVec2::new(1.0, 0.0),
      DVec2::new(1.0, 1.0),
      DVec2::new(0.0, 1.0),
    ];
    assert!(is_convex(&square));
    let dart = [
      DVec2::new(0.0, 0.0),
      DVec2::new(2.0, 0.0),
      DVec2::new(0.5, 0.5),
      DVec2::new(0.0, 2.0),
    ];
    assert!(!is_convex(&dart));
  }
}
