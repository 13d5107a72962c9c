//! Subscriber bookkeeping.
//!
//! A subscriber is a root when none of its ancestors is subscribed as
//! well. Only roots are re-rendered after an update; the rendering runtime
//! reaches the others through their ancestors.
//!
//! Root flags are kept up to date on every subscribe and unsubscribe, so
//! propagation never walks the component tree.

use std::collections::HashSet;
use std::rc::Rc;
use weft_core::{ComponentHost, ComponentId};

/// Custom update callback; returning `false` skips the re-render.
pub type Updater = Rc<dyn Fn() -> bool>;

/// Identifies one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionKey(u64);

struct Subscriber {
	key: SubscriptionKey,
	component: ComponentId,
	updater: Option<Updater>,
	root: bool,
}

/// Ancestors of `id`, nearest first.
fn ancestors(host: &dyn ComponentHost, id: ComponentId) -> Vec<ComponentId> {
	let mut chain = Vec::new();
	let mut seen = HashSet::from([id]);
	let mut current = host.parent(id);
	while let Some(parent) = current {
		if !seen.insert(parent) {
			tracing::warn!(component = %id, "cycle in component ancestry");
			break;
		}
		chain.push(parent);
		current = host.parent(parent);
	}
	chain
}

/// The registered subscribers.
#[derive(Default)]
pub struct SubscriberTree {
	subscribers: Vec<Subscriber>,
	next_key: u64,
}

impl std::fmt::Debug for SubscriberTree {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SubscriberTree")
			.field(
				"subscribers",
				&self
					.subscribers
					.iter()
					.map(|s| (s.component, s.root))
					.collect::<Vec<_>>(),
			)
			.finish()
	}
}

impl SubscriberTree {
	/// Creates an empty tree.
	pub fn new() -> Self {
		Self::default()
	}

	fn is_subscribed(&self, id: ComponentId) -> bool {
		self.subscribers.iter().any(|s| s.component == id)
	}

	/// Whether `id` has no subscribed ancestor.
	///
	/// The answer does not depend on whether `id` itself is subscribed.
	pub fn is_root(&self, host: &dyn ComponentHost, id: ComponentId) -> bool {
		!ancestors(host, id)
			.into_iter()
			.any(|ancestor| self.is_subscribed(ancestor))
	}

	/// Registers `component`.
	///
	/// Subscribers below `component` stop being roots.
	pub fn subscribe(
		&mut self,
		host: &dyn ComponentHost,
		component: ComponentId,
		updater: Option<Updater>,
	) -> SubscriptionKey {
		let key = SubscriptionKey(self.next_key);
		self.next_key += 1;

		let root = self.is_root(host, component);
		for subscriber in self.subscribers.iter_mut().filter(|s| s.root) {
			if ancestors(host, subscriber.component).contains(&component) {
				subscriber.root = false;
			}
		}
		self.subscribers.push(Subscriber {
			key,
			component,
			updater,
			root,
		});
		tracing::trace!(component = %component, root, "subscribed");
		key
	}

	/// Removes a subscription and re-evaluates the subscribers below it.
	///
	/// Returns `false` for an unknown key.
	pub fn unsubscribe(&mut self, host: &dyn ComponentHost, key: SubscriptionKey) -> bool {
		let Some(index) = self.subscribers.iter().position(|s| s.key == key) else {
			return false;
		};
		let removed = self.subscribers.remove(index);
		if self.is_subscribed(removed.component) {
			return true;
		}

		let affected: Vec<usize> = self
			.subscribers
			.iter()
			.enumerate()
			.filter(|(_, s)| !s.root && ancestors(host, s.component).contains(&removed.component))
			.map(|(index, _)| index)
			.collect();
		for index in affected {
			let component = self.subscribers[index].component;
			self.subscribers[index].root = self.is_root(host, component);
		}
		tracing::trace!(component = %removed.component, "unsubscribed");
		true
	}

	/// Drops subscriptions of components that are no longer mounted.
	///
	/// Returns how many were dropped.
	pub fn prune(&mut self, host: &dyn ComponentHost) -> usize {
		let stale: Vec<SubscriptionKey> = self
			.subscribers
			.iter()
			.filter(|s| !host.is_mounted(s.component))
			.map(|s| s.key)
			.collect();
		for key in &stale {
			self.unsubscribe(host, *key);
		}
		if !stale.is_empty() {
			tracing::debug!(count = stale.len(), "pruned unmounted subscribers");
		}
		stale.len()
	}

	/// Root subscribers with their updaters, each component once, in
	/// subscription order.
	pub fn roots(&self) -> Vec<(ComponentId, Option<Updater>)> {
		let mut seen = HashSet::new();
		self.subscribers
			.iter()
			.filter(|s| s.root && seen.insert(s.component))
			.map(|s| (s.component, s.updater.clone()))
			.collect()
	}

	/// Number of subscriptions.
	pub fn len(&self) -> usize {
		self.subscribers.len()
	}

	/// Whether nothing is subscribed.
	pub fn is_empty(&self) -> bool {
		self.subscribers.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use weft_core::ComponentArena;

	/// app
	/// ├── header
	/// │   └── title
	/// └── body
	struct Tree {
		arena: ComponentArena,
		app: ComponentId,
		header: ComponentId,
		title: ComponentId,
		body: ComponentId,
	}

	#[fixture]
	fn tree() -> Tree {
		let arena = ComponentArena::new();
		let app = arena.mount(None).unwrap();
		let header = arena.mount(Some(app)).unwrap();
		let title = arena.mount(Some(header)).unwrap();
		let body = arena.mount(Some(app)).unwrap();
		Tree {
			arena,
			app,
			header,
			title,
			body,
		}
	}

	fn root_ids(subs: &SubscriberTree) -> Vec<ComponentId> {
		subs.roots().into_iter().map(|(id, _)| id).collect()
	}

	#[rstest]
	fn test_descendant_of_subscriber_is_not_root(tree: Tree) {
		// Arrange
		let mut subs = SubscriberTree::new();

		// Act
		subs.subscribe(&tree.arena, tree.header, None);
		subs.subscribe(&tree.arena, tree.title, None);
		subs.subscribe(&tree.arena, tree.body, None);

		// Assert
		assert_eq!(root_ids(&subs), vec![tree.header, tree.body]);
		assert!(!subs.is_root(&tree.arena, tree.title));
	}

	#[rstest]
	fn test_skips_unsubscribed_ancestors(tree: Tree) {
		let mut subs = SubscriberTree::new();

		subs.subscribe(&tree.arena, tree.app, None);
		subs.subscribe(&tree.arena, tree.title, None);

		assert_eq!(root_ids(&subs), vec![tree.app]);
	}

	#[rstest]
	fn test_ancestor_subscribing_later_demotes_descendants(tree: Tree) {
		let mut subs = SubscriberTree::new();
		subs.subscribe(&tree.arena, tree.title, None);
		subs.subscribe(&tree.arena, tree.body, None);

		subs.subscribe(&tree.arena, tree.app, None);

		assert_eq!(root_ids(&subs), vec![tree.app]);
	}

	#[rstest]
	fn test_unsubscribe_promotes_descendants(tree: Tree) {
		// Arrange
		let mut subs = SubscriberTree::new();
		let app_key = subs.subscribe(&tree.arena, tree.app, None);
		subs.subscribe(&tree.arena, tree.header, None);
		subs.subscribe(&tree.arena, tree.title, None);

		// Act
		assert!(subs.unsubscribe(&tree.arena, app_key));

		// Assert
		assert_eq!(root_ids(&subs), vec![tree.header]);
		assert!(!subs.unsubscribe(&tree.arena, app_key));
	}

	#[rstest]
	fn test_duplicate_subscription_listed_once(tree: Tree) {
		let mut subs = SubscriberTree::new();
		let first = subs.subscribe(&tree.arena, tree.body, None);
		subs.subscribe(&tree.arena, tree.body, None);

		assert_eq!(root_ids(&subs), vec![tree.body]);
		subs.unsubscribe(&tree.arena, first);
		assert_eq!(subs.len(), 1);
		assert_eq!(root_ids(&subs), vec![tree.body]);
	}

	#[rstest]
	fn test_prune_unmounted(tree: Tree) {
		let mut subs = SubscriberTree::new();
		subs.subscribe(&tree.arena, tree.header, None);
		subs.subscribe(&tree.arena, tree.title, None);
		subs.subscribe(&tree.arena, tree.body, None);

		tree.arena.unmount(tree.header);
		let pruned = subs.prune(&tree.arena);

		assert_eq!(pruned, 2);
		assert_eq!(root_ids(&subs), vec![tree.body]);
	}
}
