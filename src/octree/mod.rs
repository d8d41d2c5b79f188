//! Loose octree over indexed bounding boxes.
//!
//! Backs the cluster's node and edge indexes and the point-box cloud.
//! Items are `(index, Aabb)` pairs; an item is stored in the deepest cell
//! that fully contains its bounds, so straddling items live higher up.
//!
//! Building is not thread-safe; callers must finish construction before
//! querying from multiple threads.

pub mod bounds;

pub use bounds::Aabb;

use glam::DVec3;
use smallvec::SmallVec;

/// Entries per cell before it subdivides.
const MAX_CELL_ITEMS: usize = 16;
/// Maximum subdivision depth.
const MAX_DEPTH: u8 = 8;

struct Cell {
	bounds: Aabb,
	entries: SmallVec<[u32; 8]>,
	children: Option<Box<[Cell; 8]>>,
}

impl Cell {
	fn new(bounds: Aabb) -> Self {
		Self {
			bounds,
			entries: SmallVec::new(),
			children: None,
		}
	}

	fn octant(&self, i: usize) -> Aabb {
		let center = self.bounds.center();
		let he = self.bounds.half_extents() * 0.5;
		let offset = DVec3::new(
			if i & 1 == 0 { -he.x } else { he.x },
			if i & 2 == 0 { -he.y } else { he.y },
			if i & 4 == 0 { -he.z } else { he.z },
		);
		Aabb::from_center_half_extents(center + offset, he)
	}
}

/// Octree over `(index, Aabb)` items.
pub struct ItemOctree {
	root: Cell,
	items: Vec<(u32, Aabb)>,
}

impl ItemOctree {
	/// Create an empty octree covering `bounds`.
	pub fn new(bounds: Aabb) -> Self {
		Self {
			root: Cell::new(bounds),
			items: Vec::new(),
		}
	}

	/// Build an octree covering `bounds` from an item iterator.
	pub fn build(bounds: Aabb, items: impl IntoIterator<Item = (u32, Aabb)>) -> Self {
		let mut octree = Self::new(bounds);
		for (index, item_bounds) in items {
			octree.add(index, item_bounds);
		}
		octree
	}

	/// Number of items stored.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// True when no items are stored.
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Bounds this octree covers.
	pub fn bounds(&self) -> &Aabb {
		&self.root.bounds
	}

	/// Insert an item. Items extending past the root bounds are kept at
	/// the root cell.
	pub fn add(&mut self, index: u32, item_bounds: Aabb) {
		let entry = self.items.len() as u32;
		self.items.push((index, item_bounds));
		Self::insert(&mut self.root, &self.items, entry, 0);
	}

	fn insert(cell: &mut Cell, items: &[(u32, Aabb)], entry: u32, depth: u8) {
		let item_bounds = &items[entry as usize].1;

		if let Some(children) = cell.children.as_mut() {
			for child in children.iter_mut() {
				if child.bounds.contains(item_bounds) {
					Self::insert(child, items, entry, depth + 1);
					return;
				}
			}
			cell.entries.push(entry);
			return;
		}

		cell.entries.push(entry);

		if cell.entries.len() > MAX_CELL_ITEMS && depth < MAX_DEPTH {
			let mut children: Vec<Cell> = (0..8).map(|i| Cell::new(cell.octant(i))).collect();
			let entries = std::mem::take(&mut cell.entries);
			'outer: for e in entries {
				let eb = &items[e as usize].1;
				for child in children.iter_mut() {
					if child.bounds.contains(eb) {
						Self::insert(child, items, e, depth + 1);
						continue 'outer;
					}
				}
				cell.entries.push(e);
			}
			let boxed: Box<[Cell; 8]> = match children.try_into() {
				Ok(array) => Box::new(array),
				Err(_) => unreachable!("octant count is fixed"),
			};
			cell.children = Some(boxed);
		}
	}

	/// Visit every item whose bounds contain `point`.
	pub fn find_nearby(&self, point: DVec3, mut visit: impl FnMut(u32, &Aabb)) {
		self.visit_point(&self.root, point, &mut visit);
	}

	fn visit_point(&self, cell: &Cell, point: DVec3, visit: &mut impl FnMut(u32, &Aabb)) {
		for &entry in &cell.entries {
			let (index, item_bounds) = &self.items[entry as usize];
			if item_bounds.contains_point(point) {
				visit(*index, item_bounds);
			}
		}
		if let Some(children) = cell.children.as_ref() {
			for child in children.iter() {
				if child.bounds.contains_point(point) {
					self.visit_point(child, point, visit);
				}
			}
		}
	}

	/// Visit every item whose bounds overlap `query`.
	pub fn find_with_bounds(&self, query: &Aabb, mut visit: impl FnMut(u32, &Aabb)) {
		self.visit_bounds(&self.root, query, &mut visit);
	}

	fn visit_bounds(&self, cell: &Cell, query: &Aabb, visit: &mut impl FnMut(u32, &Aabb)) {
		for &entry in &cell.entries {
			let (index, item_bounds) = &self.items[entry as usize];
			if item_bounds.overlaps(query) {
				visit(*index, item_bounds);
			}
		}
		if let Some(children) = cell.children.as_ref() {
			for child in children.iter() {
				if child.bounds.overlaps(query) {
					self.visit_bounds(child, query, visit);
				}
			}
		}
	}

	/// First item (in storage order within the visited cells) whose bounds
	/// overlap `query` and satisfy `pred`.
	pub fn find_first_with_bounds(&self, query: &Aabb, mut pred: impl FnMut(u32) -> bool) -> Option<u32> {
		self.first_bounds(&self.root, query, &mut pred)
	}

	fn first_bounds(&self, cell: &Cell, query: &Aabb, pred: &mut impl FnMut(u32) -> bool) -> Option<u32> {
		for &entry in &cell.entries {
			let (index, item_bounds) = &self.items[entry as usize];
			if item_bounds.overlaps(query) && pred(*index) {
				return Some(*index);
			}
		}
		if let Some(children) = cell.children.as_ref() {
			for child in children.iter() {
				if child.bounds.overlaps(query) {
					if let Some(found) = self.first_bounds(child, query, pred) {
						return Some(found);
					}
				}
			}
		}
		None
	}
}

#[cfg(test)]
#[path = "octree_test.rs"]
mod octree_test;
