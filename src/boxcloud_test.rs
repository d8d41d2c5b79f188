use std::f64::consts::FRAC_PI_2;

use glam::{DQuat, DVec3};

use super::*;
use crate::octree::Aabb;
use crate::tables::PointTable;

/// Unit boxes (half-extents 0.5) at the given positions.
fn cloud_at(positions: Vec<DVec3>) -> PointBoxCloud {
  let points = PointTable::from_positions(positions);
  PointBoxCloud::new(&points, BoundsSource::Raw, 0.0)
}

#[test]
fn test_sample_weight_profile() {
  let cloud = cloud_at(vec![DVec3::ZERO]);

  let center = cloud.sample(DVec3::ZERO);
  assert_eq!(center.len(), 1);
  assert!((center[0].weight - 1.0).abs() < 1e-12);
  assert!(center[0].is_inside);

  // Corner of the box: fully normalized on every axis
  let corner = cloud.sample(DVec3::splat(0.5));
  assert_eq!(corner.len(), 1);
  assert!(corner[0].weight.abs() < 1e-12);
  assert_eq!(corner[0].uvw, DVec3::ONE);

  // Outside points produce no samples
  assert!(cloud.sample(DVec3::new(0.6, 0.0, 0.0)).is_empty());
}

#[test]
fn test_rotated_box_inside() {
  // A long thin box rotated 90 degrees about Z now extends along Y
  let points = PointTable {
    positions: vec![DVec3::ZERO],
    rotations: vec![DQuat::from_rotation_z(FRAC_PI_2)],
    extents: vec![DVec3::new(1.0, 0.1, 0.1)],
    scales: vec![DVec3::ONE],
    densities: vec![1.0],
  };
  let cloud = PointBoxCloud::new(&points, BoundsSource::Raw, 0.0);

  assert!(cloud.is_inside(DVec3::new(0.0, 0.9, 0.0)));
  assert!(!cloud.is_inside(DVec3::new(0.9, 0.0, 0.0)));
}

#[test]
fn test_bounds_source_scaling() {
  let mut points = PointTable::from_positions(vec![DVec3::ZERO]);
  points.scales[0] = DVec3::splat(2.0);
  points.densities[0] = 0.5;

  let raw = PointBoxCloud::new(&points, BoundsSource::Raw, 0.0);
  let scaled = PointBoxCloud::new(&points, BoundsSource::Scaled, 0.0);
  let density = PointBoxCloud::new(&points, BoundsSource::Density, 0.0);

  let probe = DVec3::new(0.8, 0.0, 0.0);
  assert!(!raw.is_inside(probe)); // half-extent 0.5
  assert!(scaled.is_inside(probe)); // half-extent 1.0
  assert!(!density.is_inside(probe)); // back down to 0.5
}

#[test]
fn test_expansion_clamps() {
  let points = PointTable::from_positions(vec![DVec3::ZERO]);

  let grown = PointBoxCloud::new(&points, BoundsSource::Raw, 0.5);
  assert!(grown.is_inside(DVec3::new(0.9, 0.0, 0.0)));

  // Shrinking past zero leaves a degenerate but valid box
  let shrunk = PointBoxCloud::new(&points, BoundsSource::Raw, -2.0);
  assert!(!shrunk.is_inside(DVec3::new(0.1, 0.0, 0.0)));
  assert!(shrunk.is_inside(DVec3::ZERO));
}

#[test]
fn test_segment_cuts_ordered() {
  let cloud = cloud_at(vec![DVec3::ZERO, DVec3::new(3.0, 0.0, 0.0)]);

  let mut hits = Intersections::new(DVec3::new(-2.0, 0.0, 0.0), DVec3::new(5.0, 0.0, 0.0));
  cloud.find_intersections(&mut hits);

  assert_eq!(hits.len(), 4);
  let xs: Vec<f64> = hits.cuts.iter().map(|c| c.position.x).collect();
  for (x, expected) in xs.iter().zip([-0.5, 0.5, 2.5, 3.5]) {
    assert!((x - expected).abs() < 1e-9, "cut at {x}, expected {expected}");
  }

  // Entry normals face the segment start, exit normals face its end
  assert!((hits.cuts[0].normal - (-DVec3::X)).length() < 1e-9);
  assert!((hits.cuts[1].normal - DVec3::X).length() < 1e-9);
  assert!((hits.cuts[2].normal - (-DVec3::X)).length() < 1e-9);
  assert!((hits.cuts[3].normal - DVec3::X).length() < 1e-9);
}

#[test]
fn test_segment_start_inside_skips_entry() {
  let cloud = cloud_at(vec![DVec3::ZERO, DVec3::new(3.0, 0.0, 0.0)]);

  let mut hits = Intersections::new(DVec3::ZERO, DVec3::new(5.0, 0.0, 0.0));
  cloud.find_intersections(&mut hits);

  assert_eq!(hits.len(), 3);
  assert!((hits.cuts[0].position.x - 0.5).abs() < 1e-9);
}

#[test]
fn test_coincident_cuts_deduped() {
  // Two identical boxes produce coincident surface cuts
  let cloud = cloud_at(vec![DVec3::ZERO, DVec3::ZERO]);

  let mut hits = Intersections::new(DVec3::new(-2.0, 0.0, 0.0), DVec3::new(2.0, 0.0, 0.0));
  cloud.find_intersections(&mut hits);

  assert_eq!(hits.len(), 2);
}

#[test]
fn test_is_inside_collect() {
  let cloud = cloud_at(vec![DVec3::ZERO, DVec3::new(0.4, 0.0, 0.0)]);

  let mut indices = Vec::new();
  cloud.is_inside_collect(DVec3::new(0.2, 0.0, 0.0), &mut indices);
  indices.sort_unstable();
  assert_eq!(indices, vec![0, 1]);

  indices.clear();
  cloud.is_inside_collect(DVec3::new(-0.3, 0.0, 0.0), &mut indices);
  assert_eq!(indices, vec![0]);
}

#[test]
fn test_loose_overlap_and_encompass() {
  let cloud = cloud_at(vec![DVec3::ZERO, DVec3::new(4.0, 0.0, 0.0)]);

  let near = Aabb::from_sphere(DVec3::new(2.0, 0.0, 0.0), 0.1);
  let far = Aabb::from_sphere(DVec3::new(50.0, 0.0, 0.0), 0.1);

  assert!(cloud.loose_overlaps(&near));
  assert!(!cloud.loose_overlaps(&far));
  assert!(cloud.encompasses(&near));
  assert!(!cloud.encompasses(&far));
}

#[test]
fn test_empty_cloud() {
  let cloud = cloud_at(Vec::new());
  assert!(cloud.is_empty());
  assert!(!cloud.is_inside(DVec3::ZERO));
}
