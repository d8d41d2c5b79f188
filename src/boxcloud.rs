//! Oriented point-box cloud with inside, sample and segment-cut queries.
//!
//! Every point of a dataset is wrapped in an oriented box built from its
//! local bounds, rotated and translated by the point transform. The cloud
//! indexes all boxes in an octree sized to the overall bounds times 1.5.

use glam::{DQuat, DVec3};

use crate::octree::{Aabb, ItemOctree};
use crate::tables::PointTable;

/// Positions closer than this collapse into one cut.
const CUT_TOLERANCE: f64 = 1e-6;

/// Which local bounds a point's box is derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundsSource {
  /// Raw half-extents.
  Raw,
  /// Half-extents times the point scale.
  Scaled,
  /// Scaled half-extents times the point density.
  Density,
}

/// One sample of a query point against a box.
#[derive(Clone, Copy, Debug)]
pub struct Sample {
  pub box_index: u32,
  /// Signed local-space offsets from the box center.
  pub distances: DVec3,
  /// Local offsets normalized by the half-extents.
  pub uvw: DVec3,
  /// Confidence: 1 at the center, 0 at the surface and beyond.
  pub weight: f64,
  pub is_inside: bool,
}

/// One segment-surface crossing.
#[derive(Clone, Copy, Debug)]
pub struct Cut {
  pub position: DVec3,
  pub normal: DVec3,
  pub box_index: u32,
}

/// An oriented box around one point.
#[derive(Clone, Copy, Debug)]
pub struct PointBox {
  pub index: u32,
  /// World-space search bounds (sphere around the box).
  pub bounds: Aabb,
  position: DVec3,
  rotation: DQuat,
  inv_rotation: DQuat,
  extents: DVec3,
}

impl PointBox {
  /// Build the box for one vertex row.
  ///
  /// `expansion` grows (or, when negative, shrinks) the half-extents; it
  /// is clamped so the box never inverts.
  pub fn new(points: &PointTable, row: u32, source: BoundsSource, expansion: f64) -> Self {
    let i = row as usize;
    let base = match source {
      BoundsSource::Raw => points.extents[i],
      BoundsSource::Scaled => points.extents[i] * points.scales[i],
      BoundsSource::Density => points.extents[i] * points.scales[i] * points.densities[i],
    };
    let extents = (base + DVec3::splat(expansion)).max(DVec3::splat(1e-8));
    let rotation = points.rotations[i];
    let position = points.positions[i];

    Self {
      index: row,
      bounds: Aabb::from_sphere(position, extents.length() * 1.5),
      position,
      rotation,
      inv_rotation: rotation.inverse(),
      extents,
    }
  }

  /// Query point in the box's local space.
  #[inline]
  fn to_local(&self, point: DVec3) -> DVec3 {
    self.inv_rotation * (point - self.position)
  }

  /// True when the point lies inside the oriented box.
  pub fn is_inside(&self, point: DVec3) -> bool {
    let local = self.to_local(point).abs();
    local.x <= self.extents.x && local.y <= self.extents.y && local.z <= self.extents.z
  }

  /// Sample a point against this box.
  pub fn sample(&self, point: DVec3) -> Sample {
    let local = self.to_local(point);
    let normalized = (local.abs() / self.extents).clamp(DVec3::ZERO, DVec3::ONE);
    Sample {
      box_index: self.index,
      distances: local,
      uvw: local / self.extents,
      weight: 1.0 - (normalized.x + normalized.y + normalized.z) / 3.0,
      is_inside: local.abs().cmple(self.extents).all(),
    }
  }

  /// Cut the segment against the box surface, appending entry/exit cuts.
  ///
  /// A start point inside the box yields only the exit cut, an end point
  /// inside only the entry cut.
  pub fn segment_intersections(&self, start: DVec3, end: DVec3, out: &mut Vec<Cut>) {
    let s = self.to_local(start);
    let e = self.to_local(end);
    let dir = e - s;

    let mut t_min = 0.0f64;
    let mut t_max = 1.0f64;
    let mut axis_min = 0usize;
    let mut axis_max = 0usize;

    for axis in 0..3 {
      let (origin, delta, extent) = (s[axis], dir[axis], self.extents[axis]);
      if delta.abs() < f64::EPSILON {
        if origin.abs() > extent {
          return;
        }
        continue;
      }
      let mut t1 = (-extent - origin) / delta;
      let mut t2 = (extent - origin) / delta;
      if t1 > t2 {
        std::mem::swap(&mut t1, &mut t2);
      }
      if t1 > t_min {
        t_min = t1;
        axis_min = axis;
      }
      if t2 < t_max {
        t_max = t2;
        axis_max = axis;
      }
      if t_min > t_max {
        return;
      }
    }

    let segment = end - start;
    let mut push = |t: f64, axis: usize| {
      let local = s + dir * t;
      let mut normal = DVec3::ZERO;
      normal[axis] = local[axis].signum();
      out.push(Cut {
        position: start + segment * t,
        normal: self.rotation * normal,
        box_index: self.index,
      });
    };

    // t_min == 0 means the start is inside: no entry cut
    if t_min > 0.0 {
      push(t_min, axis_min);
    }
    if t_max < 1.0 {
      push(t_max, axis_max);
    }
  }
}

/// Ordered, deduplicated cuts of one segment against a cloud.
#[derive(Clone, Debug)]
pub struct Intersections {
  pub start: DVec3,
  pub end: DVec3,
  pub cuts: Vec<Cut>,
}

impl Intersections {
  pub fn new(start: DVec3, end: DVec3) -> Self {
    Self {
      start,
      end,
      cuts: Vec::new(),
    }
  }

  pub fn len(&self) -> usize {
    self.cuts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cuts.is_empty()
  }

  /// Order cuts by distance from the segment start and collapse cuts
  /// closer together than the tolerance.
  pub fn sort_and_dedupe(&mut self) {
    let start = self.start;
    self
      .cuts
      .sort_by(|a, b| {
        (a.position - start)
          .length_squared()
          .total_cmp(&(b.position - start).length_squared())
      });
    self.cuts.dedup_by(|a, b| (a.position - b.position).length() < CUT_TOLERANCE);
  }
}

/// A cloud of oriented point boxes behind an octree.
pub struct PointBoxCloud {
  boxes: Vec<PointBox>,
  octree: ItemOctree,
  bounds: Aabb,
}

impl PointBoxCloud {
  pub fn new(points: &PointTable, source: BoundsSource, expansion: f64) -> Self {
    let boxes: Vec<PointBox> = (0..points.len() as u32)
      .map(|row| PointBox::new(points, row, source, expansion))
      .collect();

    let mut bounds = match boxes.first() {
      Some(first) => first.bounds,
      None => Aabb::from_point(DVec3::ZERO),
    };
    for b in boxes.iter().skip(1) {
      bounds.union(&b.bounds);
    }

    let octree = ItemOctree::build(bounds.scaled(1.5), boxes.iter().map(|b| (b.index, b.bounds)));

    Self {
      boxes,
      octree,
      bounds,
    }
  }

  pub fn len(&self) -> usize {
    self.boxes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.boxes.is_empty()
  }

  pub fn bounds(&self) -> &Aabb {
    &self.bounds
  }

  #[inline]
  pub fn point_box(&self, index: u32) -> &PointBox {
    &self.boxes[index as usize]
  }

  /// True when any box contains the point.
  pub fn is_inside(&self, point: DVec3) -> bool {
    let mut inside = false;
    self.octree.find_nearby(point, |index, _| {
      if !inside && self.boxes[index as usize].is_inside(point) {
        inside = true;
      }
    });
    inside
  }

  /// Collect the indices of every box containing the point.
  pub fn is_inside_collect(&self, point: DVec3, out: &mut Vec<u32>) {
    self.octree.find_nearby(point, |index, _| {
      if self.boxes[index as usize].is_inside(point) {
        out.push(index);
      }
    });
  }

  /// Sample the point against every box containing it.
  pub fn sample(&self, point: DVec3) -> Vec<Sample> {
    let mut samples = Vec::new();
    self.octree.find_nearby(point, |index, _| {
      let sample = self.boxes[index as usize].sample(point);
      if sample.is_inside {
        samples.push(sample);
      }
    });
    samples
  }

  /// Cut the segment against every box it passes near. Cuts come back
  /// ordered from the segment start, deduplicated.
  pub fn find_intersections(&self, intersections: &mut Intersections) {
    let mut query = Aabb::from_point(intersections.start);
    query.union_point(intersections.end);

    let mut cuts = std::mem::take(&mut intersections.cuts);
    let (start, end) = (intersections.start, intersections.end);
    self.octree.find_with_bounds(&query, |index, _| {
      self.boxes[index as usize].segment_intersections(start, end, &mut cuts);
    });
    intersections.cuts = cuts;
    intersections.sort_and_dedupe();
  }

  /// Cheap pre-filter: the cloud's bounds overlap the other bounds.
  pub fn loose_overlaps(&self, other: &Aabb) -> bool {
    self.bounds.overlaps(other)
  }

  /// Cheap pre-filter: the cloud's bounds fully contain the other bounds.
  pub fn encompasses(&self, other: &Aabb) -> bool {
    self.bounds.contains(other)
  }
}

#[cfg(test)]
#[path = "boxcloud_test.rs"]
mod boxcloud_test;
