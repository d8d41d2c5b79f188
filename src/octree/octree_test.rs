use super::*;
use glam::DVec3;

fn world() -> Aabb {
	Aabb::from_center_half_extents(DVec3::ZERO, DVec3::splat(100.0))
}

fn unit_box_at(p: DVec3) -> Aabb {
	Aabb::from_center_half_extents(p, DVec3::splat(0.5))
}

#[test]
fn test_find_with_bounds() {
	let mut octree = ItemOctree::new(world());
	for i in 0..10 {
		octree.add(i, unit_box_at(DVec3::new(i as f64 * 10.0 - 45.0, 0.0, 0.0)));
	}
	assert_eq!(octree.len(), 10);

	let query = Aabb::from_center_half_extents(DVec3::new(-45.0, 0.0, 0.0), DVec3::splat(1.0));
	let mut hits = Vec::new();
	octree.find_with_bounds(&query, |index, _| hits.push(index));
	assert_eq!(hits, vec![0]);

	let wide = Aabb::from_center_half_extents(DVec3::ZERO, DVec3::splat(200.0));
	let mut all = Vec::new();
	octree.find_with_bounds(&wide, |index, _| all.push(index));
	all.sort_unstable();
	assert_eq!(all, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_find_nearby_containing_point() {
	let mut octree = ItemOctree::new(world());
	octree.add(0, unit_box_at(DVec3::ZERO));
	octree.add(1, unit_box_at(DVec3::new(50.0, 0.0, 0.0)));
	// Large box stored high up because it straddles octants
	octree.add(2, Aabb::from_center_half_extents(DVec3::ZERO, DVec3::splat(60.0)));

	let mut hits = Vec::new();
	octree.find_nearby(DVec3::new(50.0, 0.0, 0.0), |index, _| hits.push(index));
	hits.sort_unstable();
	assert_eq!(hits, vec![1, 2]);
}

#[test]
fn test_subdivision_keeps_all_items_queryable() {
	let mut octree = ItemOctree::new(world());
	let mut expected = Vec::new();
	for i in 0..200u32 {
		let p = DVec3::new(
			(i % 10) as f64 * 10.0 - 45.0,
			((i / 10) % 10) as f64 * 10.0 - 45.0,
			(i / 100) as f64 * 10.0 - 45.0,
		);
		octree.add(i, unit_box_at(p));
		expected.push(i);
	}

	let wide = Aabb::from_center_half_extents(DVec3::ZERO, DVec3::splat(200.0));
	let mut all = Vec::new();
	octree.find_with_bounds(&wide, |index, _| all.push(index));
	all.sort_unstable();
	assert_eq!(all, expected);
}

#[test]
fn test_find_first_with_bounds() {
	let mut octree = ItemOctree::new(world());
	octree.add(0, unit_box_at(DVec3::ZERO));
	octree.add(1, unit_box_at(DVec3::new(1.0, 0.0, 0.0)));

	let query = Aabb::from_center_half_extents(DVec3::new(0.5, 0.0, 0.0), DVec3::splat(2.0));
	let found = octree.find_first_with_bounds(&query, |index| index == 1);
	assert_eq!(found, Some(1));

	let none = octree.find_first_with_bounds(&query, |index| index == 7);
	assert_eq!(none, None);
}
