//! Axis-aligned bounding box with double precision for large worlds.

use glam::DVec3;

/// Double-precision axis-aligned bounding box.
///
/// Used for cluster bounds, octree cells and point-box search bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
	/// Minimum corner (inclusive).
	pub min: DVec3,
	/// Maximum corner (inclusive).
	pub max: DVec3,
}

impl Aabb {
	/// Create a new AABB from min and max corners.
	///
	/// # Panics
	/// Debug-asserts that min <= max on all axes.
	pub fn new(min: DVec3, max: DVec3) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y && min.z <= max.z,
			"AABB min must be <= max on all axes"
		);
		Self { min, max }
	}

	/// Create a new AABB from center and half-extents.
	pub fn from_center_half_extents(center: DVec3, half_extents: DVec3) -> Self {
		Self {
			min: center - half_extents,
			max: center + half_extents,
		}
	}

	/// Create an AABB enclosing a sphere.
	pub fn from_sphere(center: DVec3, radius: f64) -> Self {
		Self::from_center_half_extents(center, DVec3::splat(radius))
	}

	/// Create a degenerate AABB containing a single point.
	pub fn from_point(point: DVec3) -> Self {
		Self {
			min: point,
			max: point,
		}
	}

	/// Check if this AABB overlaps with another.
	///
	/// Two AABBs overlap if they share any interior or boundary points.
	#[inline]
	pub fn overlaps(&self, other: &Aabb) -> bool {
		self.min.x <= other.max.x
			&& self.max.x >= other.min.x
			&& self.min.y <= other.max.y
			&& self.max.y >= other.min.y
			&& self.min.z <= other.max.z
			&& self.max.z >= other.min.z
	}

	/// Check if this AABB fully contains another.
	#[inline]
	pub fn contains(&self, other: &Aabb) -> bool {
		self.contains_point(other.min) && self.contains_point(other.max)
	}

	/// Check if this AABB contains a point.
	#[inline]
	pub fn contains_point(&self, point: DVec3) -> bool {
		point.x >= self.min.x
			&& point.x <= self.max.x
			&& point.y >= self.min.y
			&& point.y <= self.max.y
			&& point.z >= self.min.z
			&& point.z <= self.max.z
	}

	/// Get the size of the AABB (max - min).
	#[inline]
	pub fn size(&self) -> DVec3 {
		self.max - self.min
	}

	/// Get the center of the AABB.
	#[inline]
	pub fn center(&self) -> DVec3 {
		(self.min + self.max) * 0.5
	}

	/// Half-extents of the AABB.
	#[inline]
	pub fn half_extents(&self) -> DVec3 {
		self.size() * 0.5
	}

	/// Return this AABB grown by `amount` on all sides.
	#[inline]
	pub fn expanded(&self, amount: f64) -> Self {
		Self {
			min: self.min - DVec3::splat(amount),
			max: self.max + DVec3::splat(amount),
		}
	}

	/// Return this AABB scaled about its center.
	#[inline]
	pub fn scaled(&self, factor: f64) -> Self {
		Self::from_center_half_extents(self.center(), self.half_extents() * factor)
	}

	/// Grow this AABB to include a point.
	#[inline]
	pub fn union_point(&mut self, point: DVec3) {
		self.min = self.min.min(point);
		self.max = self.max.max(point);
	}

	/// Grow this AABB to include another AABB.
	#[inline]
	pub fn union(&mut self, other: &Aabb) {
		self.min = self.min.min(other.min);
		self.max = self.max.max(other.max);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new() {
		let aabb = Aabb::new(DVec3::new(-1.0, -2.0, -3.0), DVec3::new(1.0, 2.0, 3.0));
		assert_eq!(aabb.min, DVec3::new(-1.0, -2.0, -3.0));
		assert_eq!(aabb.max, DVec3::new(1.0, 2.0, 3.0));
	}

	#[test]
	fn test_from_center_half_extents() {
		let aabb = Aabb::from_center_half_extents(DVec3::ZERO, DVec3::splat(10.0));
		assert_eq!(aabb.min, DVec3::splat(-10.0));
		assert_eq!(aabb.max, DVec3::splat(10.0));
	}

	#[test]
	fn test_overlaps() {
		let a = Aabb::new(DVec3::ZERO, DVec3::splat(10.0));
		let b = Aabb::new(DVec3::splat(5.0), DVec3::splat(15.0));
		assert!(a.overlaps(&b));
		assert!(b.overlaps(&a));

		// Touching at boundary counts as overlapping
		let c = Aabb::new(DVec3::splat(10.0), DVec3::splat(20.0));
		assert!(a.overlaps(&c));

		let d = Aabb::new(DVec3::splat(11.0), DVec3::splat(20.0));
		assert!(!a.overlaps(&d));
	}

	#[test]
	fn test_contains_point() {
		let aabb = Aabb::new(DVec3::ZERO, DVec3::splat(10.0));
		assert!(aabb.contains_point(DVec3::splat(5.0)));
		assert!(aabb.contains_point(DVec3::ZERO));
		assert!(aabb.contains_point(DVec3::splat(10.0)));
		assert!(!aabb.contains_point(DVec3::splat(-1.0)));
		assert!(!aabb.contains_point(DVec3::splat(11.0)));
	}

	#[test]
	fn test_contains() {
		let a = Aabb::new(DVec3::ZERO, DVec3::splat(10.0));
		let b = Aabb::new(DVec3::splat(2.0), DVec3::splat(8.0));
		assert!(a.contains(&b));
		assert!(!b.contains(&a));
	}

	#[test]
	fn test_union_point() {
		let mut aabb = Aabb::from_point(DVec3::ZERO);
		aabb.union_point(DVec3::new(5.0, -3.0, 1.0));
		aabb.union_point(DVec3::new(-2.0, 4.0, 0.0));
		assert_eq!(aabb.min, DVec3::new(-2.0, -3.0, 0.0));
		assert_eq!(aabb.max, DVec3::new(5.0, 4.0, 1.0));
	}

	#[test]
	fn test_expanded_and_scaled() {
		let aabb = Aabb::new(DVec3::ZERO, DVec3::splat(10.0)).expanded(1.0);
		assert_eq!(aabb.min, DVec3::splat(-1.0));
		assert_eq!(aabb.max, DVec3::splat(11.0));

		let scaled = Aabb::new(DVec3::ZERO, DVec3::splat(10.0)).scaled(1.5);
		assert_eq!(scaled.min, DVec3::splat(-2.5));
		assert_eq!(scaled.max, DVec3::splat(12.5));
	}
}
