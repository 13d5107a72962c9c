//! A todo list store driven the way a component tree would drive it.

use rstest::{fixture, rstest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::rc::Rc;
use weft_core::{ComponentArena, ComponentId, MemoryStorage};
use weft_store::{EmitOutcome, Store, StoreError, StoreSettings, Updates};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Todo {
	title: String,
	done: bool,
}

fn set(key: &str, value: impl Serialize) -> anyhow::Result<Option<Updates>> {
	let mut updates = Map::new();
	updates.insert(key.to_string(), serde_json::to_value(value)?);
	Ok(Some(updates))
}

fn todos(host: Rc<ComponentArena>, storage: Rc<MemoryStorage>) -> Store {
	Store::builder()
		.value("todos", json!([]))
		.value("filter", "all")
		.handler("todos/add", |store, values| {
			let title = values
				.first()
				.and_then(Value::as_str)
				.ok_or_else(|| anyhow::anyhow!("missing title"))?;
			let mut list: Vec<Todo> = store.get_as("todos")?;
			list.push(Todo {
				title: title.to_string(),
				done: false,
			});
			set("todos", list)
		})
		.handler("todos/toggle", |store, values| {
			let index = values.first().and_then(Value::as_u64).unwrap_or_default() as usize;
			let mut list: Vec<Todo> = store.get_as("todos")?;
			let Some(todo) = list.get_mut(index) else {
				return Ok(None);
			};
			todo.done = !todo.done;
			set("todos", list)
		})
		.handler("filter/set", |_, values| {
			set("filter", values.first().cloned().unwrap_or(json!("all")))
		})
		.middleware("todos/", |store, _, _| {
			if store.get("filter") == Some(json!("locked")) {
				anyhow::bail!("list is locked");
			}
			Ok(())
		})
		.host(host)
		.storage(storage)
		.settings(StoreSettings::persistent())
		.build()
		.unwrap()
}

/// app
/// ├── list
/// │   └── item
/// └── footer
struct Page {
	arena: Rc<ComponentArena>,
	app: ComponentId,
	list: ComponentId,
	item: ComponentId,
	footer: ComponentId,
}

#[fixture]
fn page() -> Page {
	let arena = Rc::new(ComponentArena::new());
	let app = arena.mount(None).unwrap();
	let list = arena.mount(Some(app)).unwrap();
	let item = arena.mount(Some(list)).unwrap();
	let footer = arena.mount(Some(app)).unwrap();
	Page {
		arena,
		app,
		list,
		item,
		footer,
	}
}

#[rstest]
fn test_only_outermost_subscribers_rerender(page: Page) {
	// Arrange
	let store = todos(page.arena.clone(), Rc::new(MemoryStorage::new()));
	let _list = store.subscribe(page.list).unwrap();
	let _item = store.subscribe(page.item).unwrap();
	let _footer = store.subscribe(page.footer).unwrap();

	// Act
	store.emit("todos/add", &[json!("write docs")]).unwrap();

	// Assert
	assert_eq!(page.arena.updates(), vec![page.list, page.footer]);
	assert_eq!(page.arena.render_count(page.item), 0);
	let list: Vec<Todo> = store.get_as("todos").unwrap();
	assert_eq!(list[0].title, "write docs");
}

#[rstest]
fn test_unmounted_branch_is_forgotten(page: Page) {
	let store = todos(page.arena.clone(), Rc::new(MemoryStorage::new()));
	let _list = store.subscribe(page.list).unwrap();
	let _item = store.subscribe(page.item).unwrap();
	let _app = store.subscribe(page.app).unwrap();

	page.arena.unmount(page.list);
	store.emit("filter/set", &[json!("done")]).unwrap();

	assert_eq!(page.arena.updates(), vec![page.app]);
	assert_eq!(store.subscriber_count(), 1);
}

#[rstest]
fn test_middleware_guards_namespace(page: Page) {
	let store = todos(page.arena.clone(), Rc::new(MemoryStorage::new()));
	store.emit("filter/set", &[json!("locked")]).unwrap();

	let result = store.emit("todos/add", &[json!("blocked")]);

	assert!(matches!(result, Err(StoreError::Middleware { ref prefix, .. }) if prefix == "todos/"));
	assert_eq!(store.get("todos"), Some(json!([])));
}

#[rstest]
fn test_out_of_range_toggle_changes_nothing(page: Page) {
	let store = todos(page.arena.clone(), Rc::new(MemoryStorage::new()));

	let outcome = store.emit("todos/toggle", &[json!(4)]).unwrap();

	assert_eq!(outcome, EmitOutcome::Unchanged);
}

#[rstest]
fn test_state_survives_reload(page: Page) {
	// Arrange
	let storage = Rc::new(MemoryStorage::new());
	let store = todos(page.arena.clone(), storage.clone());
	store.emit("todos/add", &[json!("a")]).unwrap();
	store.emit("todos/toggle", &[json!(0)]).unwrap();
	drop(store);

	// Act
	let reloaded = todos(page.arena.clone(), storage);

	// Assert
	let list: Vec<Todo> = reloaded.get_as("todos").unwrap();
	assert_eq!(
		list,
		vec![Todo {
			title: "a".to_string(),
			done: true,
		}]
	);
}
