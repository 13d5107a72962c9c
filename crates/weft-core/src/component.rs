//! Rendering-runtime contract.
//!
//! The store only needs three things from the rendering runtime: the parent
//! of a mounted component, whether it is still mounted, and a way to force it
//! to re-render. [`ComponentHost`] captures exactly that.
//!
//! [`ComponentArena`] is an index arena implementing the contract. Every
//! record holds its parent id instead of a reference, so ancestor walks are
//! plain loops over indices.

use std::cell::{Cell, RefCell};
use std::fmt;
use thiserror::Error;

/// Identifier of a mounted component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Errors reported by the rendering runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum HostError {
	/// The component is not (or no longer) mounted.
	#[error("component {0} is not mounted")]
	NotMounted(ComponentId),

	/// The runtime failed to re-render the component.
	#[error("component {id} failed to update: {message}")]
	UpdateFailed {
		/// Component that failed.
		id: ComponentId,
		/// Runtime message.
		message: String,
	},
}

/// The part of the rendering runtime the store depends on.
pub trait ComponentHost {
	/// Parent of `id`, `None` for a root component or an unknown id.
	fn parent(&self, id: ComponentId) -> Option<ComponentId>;

	/// Whether `id` is currently mounted.
	fn is_mounted(&self, id: ComponentId) -> bool;

	/// Re-renders `id` and, transitively, its descendants.
	fn force_update(&self, id: ComponentId) -> Result<(), HostError>;
}

#[derive(Debug)]
struct Record {
	parent: Option<ComponentId>,
	renders: Cell<usize>,
	failing: Cell<bool>,
}

/// Index arena of component records.
///
/// Ids are never reused, so a stale id held by a subscriber can only ever
/// resolve to "not mounted".
#[derive(Debug, Default)]
pub struct ComponentArena {
	records: RefCell<Vec<Option<Record>>>,
	updates: RefCell<Vec<ComponentId>>,
}

impl ComponentArena {
	/// Creates an empty arena.
	pub fn new() -> Self {
		Self::default()
	}

	/// Mounts a component under `parent`.
	///
	/// # Errors
	///
	/// Returns [`HostError::NotMounted`] if `parent` is not mounted.
	pub fn mount(&self, parent: Option<ComponentId>) -> Result<ComponentId, HostError> {
		if let Some(parent) = parent
			&& !self.is_mounted(parent)
		{
			return Err(HostError::NotMounted(parent));
		}

		let mut records = self.records.borrow_mut();
		let id = ComponentId(records.len());
		records.push(Some(Record {
			parent,
			renders: Cell::new(0),
			failing: Cell::new(false),
		}));
		Ok(id)
	}

	/// Unmounts `id` together with all of its descendants.
	///
	/// Returns the ids that were unmounted, `id` first.
	pub fn unmount(&self, id: ComponentId) -> Vec<ComponentId> {
		if !self.is_mounted(id) {
			return Vec::new();
		}

		let mut removed = vec![id];
		let mut records = self.records.borrow_mut();
		// Children always have higher ids than their parent.
		for index in id.0 + 1..records.len() {
			let is_descendant = records[index]
				.as_ref()
				.and_then(|record| record.parent)
				.is_some_and(|parent| removed.contains(&parent));
			if is_descendant {
				removed.push(ComponentId(index));
			}
		}
		for removed_id in &removed {
			records[removed_id.0] = None;
		}
		removed
	}

	/// Number of times `id` was force-updated.
	pub fn render_count(&self, id: ComponentId) -> usize {
		self.records
			.borrow()
			.get(id.0)
			.and_then(Option::as_ref)
			.map_or(0, |record| record.renders.get())
	}

	/// Every successful force-update, in order.
	pub fn updates(&self) -> Vec<ComponentId> {
		self.updates.borrow().clone()
	}

	/// Clears the update log.
	pub fn clear_updates(&self) {
		self.updates.borrow_mut().clear();
	}

	/// Makes force-updates of `id` fail.
	pub fn set_failing(&self, id: ComponentId, failing: bool) {
		if let Some(Some(record)) = self.records.borrow().get(id.0) {
			record.failing.set(failing);
		}
	}

	/// Ancestors of `id`, nearest first.
	pub fn ancestors(&self, id: ComponentId) -> Vec<ComponentId> {
		let mut chain = Vec::new();
		let mut current = self.parent(id);
		while let Some(parent) = current {
			chain.push(parent);
			current = self.parent(parent);
		}
		chain
	}
}

impl ComponentHost for ComponentArena {
	fn parent(&self, id: ComponentId) -> Option<ComponentId> {
		self.records
			.borrow()
			.get(id.0)
			.and_then(Option::as_ref)
			.and_then(|record| record.parent)
	}

	fn is_mounted(&self, id: ComponentId) -> bool {
		matches!(self.records.borrow().get(id.0), Some(Some(_)))
	}

	fn force_update(&self, id: ComponentId) -> Result<(), HostError> {
		let records = self.records.borrow();
		let record = records
			.get(id.0)
			.and_then(Option::as_ref)
			.ok_or(HostError::NotMounted(id))?;

		if record.failing.get() {
			return Err(HostError::UpdateFailed {
				id,
				message: "render failed".to_string(),
			});
		}

		record.renders.set(record.renders.get() + 1);
		self.updates.borrow_mut().push(id);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	/// root -> child -> grandchild, root -> sibling
	#[fixture]
	fn tree() -> (ComponentArena, [ComponentId; 4]) {
		let arena = ComponentArena::new();
		let root = arena.mount(None).unwrap();
		let child = arena.mount(Some(root)).unwrap();
		let grandchild = arena.mount(Some(child)).unwrap();
		let sibling = arena.mount(Some(root)).unwrap();
		(arena, [root, child, grandchild, sibling])
	}

	#[rstest]
	fn test_parent_and_ancestors(tree: (ComponentArena, [ComponentId; 4])) {
		let (arena, [root, child, grandchild, _]) = tree;
		assert_eq!(arena.parent(root), None);
		assert_eq!(arena.parent(grandchild), Some(child));
		assert_eq!(arena.ancestors(grandchild), vec![child, root]);
	}

	#[rstest]
	fn test_unmount_removes_descendants(tree: (ComponentArena, [ComponentId; 4])) {
		let (arena, [root, child, grandchild, sibling]) = tree;

		let removed = arena.unmount(child);

		assert_eq!(removed, vec![child, grandchild]);
		assert!(!arena.is_mounted(grandchild));
		assert!(arena.is_mounted(root));
		assert!(arena.is_mounted(sibling));
	}

	#[rstest]
	fn test_mount_under_unmounted_parent_fails(tree: (ComponentArena, [ComponentId; 4])) {
		let (arena, [_, child, _, _]) = tree;
		arena.unmount(child);
		assert_eq!(arena.mount(Some(child)), Err(HostError::NotMounted(child)));
	}

	#[rstest]
	fn test_force_update_counts_and_failures(tree: (ComponentArena, [ComponentId; 4])) {
		let (arena, [root, child, _, _]) = tree;

		arena.force_update(root).unwrap();
		arena.set_failing(child, true);
		let failed = arena.force_update(child);

		assert_eq!(arena.render_count(root), 1);
		assert!(matches!(failed, Err(HostError::UpdateFailed { .. })));
		assert_eq!(arena.updates(), vec![root]);
	}
}
