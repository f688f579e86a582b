//! Resource store: default CRUD semantics over nested storage.

use crate::backend::HttpBackend;
use crate::config::error::ConfigError;
use crate::config::options::MockOptions;
use crate::mocks::router::{HandlerFn, RouteHandle, Router};
use crate::types::method::HttpMethod;
use crate::types::reply::{HttpError, Reply};
use crate::types::request::RequestEnvelope;
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

/// Default implementation of one CRUD action, handed to overrides so
/// they can call through to it.
pub type DefaultAction = fn(&ResourceStore, &RequestEnvelope) -> Option<Reply>;

/// Replacement for a CRUD action. Receives the store, the request, and
/// the default implementation it may delegate to.
pub type ActionFn = Rc<dyn Fn(&ResourceStore, &RequestEnvelope, DefaultAction) -> Option<Reply>>;

#[derive(Default)]
struct Overrides {
    index: Option<ActionFn>,
    show: Option<ActionFn>,
    create: Option<ActionFn>,
    update: Option<ActionFn>,
    delete: Option<ActionFn>,
}

struct StoreInner {
    router: Router,
    storage: RefCell<Value>,
    overrides: RefCell<Overrides>,
    // Filled right after the five CRUD routes are registered
    index_route: RefCell<Option<RouteHandle>>,
}

/// Mock of one RESTful collection backed by nested key-value storage.
///
/// Registers five routes at construction: GET base (index), GET `/?`
/// (show), POST base (create), PUT `/?` (update), DELETE `/?` (delete).
/// Storage is a recursively nested JSON object addressed one key per
/// path argument; leaf items are objects carrying an `id` field. The
/// store owns its storage exclusively and mutates it in place under the
/// strictly sequential call model of the transport.
#[derive(Clone)]
pub struct ResourceStore {
    inner: Rc<StoreInner>,
}

impl ResourceStore {
    /// Build a store over `storage`, or over a fresh empty object when
    /// none is supplied.
    pub fn new(
        base: &str,
        storage: Option<Value>,
        options: MockOptions,
        backend: Rc<RefCell<dyn HttpBackend>>,
    ) -> Result<Self, ConfigError> {
        let router = Router::new(base, options, backend)?;
        let inner = Rc::new(StoreInner {
            router,
            storage: RefCell::new(storage.unwrap_or_else(|| json!({}))),
            overrides: RefCell::new(Overrides::default()),
            index_route: RefCell::new(None),
        });
        let store = Self { inner };

        let index = store.register(HttpMethod::Get, "", default_index, |o| o.index.clone())?;
        let show = store.register(HttpMethod::Get, "/?", default_show, |o| o.show.clone())?;
        let create = store.register(HttpMethod::Post, "", default_create, |o| o.create.clone())?;
        let update = store.register(HttpMethod::Put, "/?", default_update, |o| o.update.clone())?;
        let delete = store.register(HttpMethod::Delete, "/?", default_delete, |o| {
            o.delete.clone()
        })?;

        store.install_labellers(&index, &[show, create, update, delete]);
        *store.inner.index_route.borrow_mut() = Some(index);
        Ok(store)
    }

    /// Build a store for a collection nested under this one. The child's
    /// base is `parent + "/?" + sub_pattern`, so items are addressed by
    /// parent id then child id. Its storage is independent data supplied
    /// by the caller.
    pub fn sub_resource_mock(
        &self,
        sub_pattern: &str,
        storage: Option<Value>,
        options: MockOptions,
    ) -> Result<ResourceStore, ConfigError> {
        let base = format!("{}/?{}", self.inner.router.base(), sub_pattern);
        ResourceStore::new(&base, storage, options, self.inner.router.backend_handle())
    }

    /// The embedded router, for registering custom routes next to the
    /// CRUD defaults.
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// Register a custom route under this store's base template.
    pub fn route(
        &self,
        method: HttpMethod,
        sub_pattern: &str,
        handler: HandlerFn,
    ) -> Result<RouteHandle, ConfigError> {
        self.inner.router.route(method, sub_pattern, handler)
    }

    /// Replace the store's options. Chainable.
    pub fn set_options(&self, options: MockOptions) -> Result<&Self, ConfigError> {
        self.inner.router.set_options(options)?;
        Ok(self)
    }

    /// Merge an untyped options patch; unknown keys fail. Chainable.
    pub fn set_options_value(&self, patch: Value) -> Result<&Self, ConfigError> {
        self.inner.router.set_options_value(patch)?;
        Ok(self)
    }

    /// Envelope singleton results under `singular` and index results
    /// under `plural`. Errors stay at the response root.
    pub fn add_labeller(&self, singular: &str, plural: &str) -> &Self {
        let mut options = self.inner.router.options();
        options.singleton_label = Some(singular.to_string());
        options.collection_label = Some(plural.to_string());
        self.inner.router.replace_options(options);
        self
    }

    /// Snapshot of the nested storage root.
    pub fn storage(&self) -> Value {
        self.inner.storage.borrow().clone()
    }

    /// Shared addressing: walk one key per path argument and return a
    /// snapshot of the value there. With `auto_create`, absent keys are
    /// created as empty containers along the way.
    pub fn get_storage(&self, path_args: &[String], auto_create: bool) -> Option<Value> {
        if auto_create {
            let mut storage = self.inner.storage.borrow_mut();
            resolve_mut(&mut storage, path_args, true).map(|v| v.clone())
        } else {
            let storage = self.inner.storage.borrow();
            resolve(&storage, path_args).cloned()
        }
    }

    /// Override the index action. The closure receives the default
    /// implementation for call-super wrapping. Chainable.
    pub fn set_index_action(
        &self,
        action: impl Fn(&ResourceStore, &RequestEnvelope, DefaultAction) -> Option<Reply> + 'static,
    ) -> &Self {
        self.inner.overrides.borrow_mut().index = Some(Rc::new(action));
        self
    }

    pub fn set_show_action(
        &self,
        action: impl Fn(&ResourceStore, &RequestEnvelope, DefaultAction) -> Option<Reply> + 'static,
    ) -> &Self {
        self.inner.overrides.borrow_mut().show = Some(Rc::new(action));
        self
    }

    pub fn set_create_action(
        &self,
        action: impl Fn(&ResourceStore, &RequestEnvelope, DefaultAction) -> Option<Reply> + 'static,
    ) -> &Self {
        self.inner.overrides.borrow_mut().create = Some(Rc::new(action));
        self
    }

    pub fn set_update_action(
        &self,
        action: impl Fn(&ResourceStore, &RequestEnvelope, DefaultAction) -> Option<Reply> + 'static,
    ) -> &Self {
        self.inner.overrides.borrow_mut().update = Some(Rc::new(action));
        self
    }

    pub fn set_delete_action(
        &self,
        action: impl Fn(&ResourceStore, &RequestEnvelope, DefaultAction) -> Option<Reply> + 'static,
    ) -> &Self {
        self.inner.overrides.borrow_mut().delete = Some(Rc::new(action));
        self
    }

    /// Filter index results on equality between the `name` query
    /// parameter and the item's `name` field. No-op when the parameter
    /// is absent. Chainable.
    pub fn add_index_filter(&self, name: &str) -> &Self {
        let field = name.to_string();
        self.add_index_filter_with(name, move |arg, item| {
            field_as_string(item, &field).as_deref() == Some(arg)
        })
    }

    /// Filter index results with a custom predicate over (query argument,
    /// item). Chainable.
    pub fn add_index_filter_with(
        &self,
        name: &str,
        filter: impl Fn(&str, &Value) -> bool + 'static,
    ) -> &Self {
        let name = name.to_string();
        self.index_handle().add_post_proc(Rc::new(move |value, request| {
            let Some(arg) = request.query.get(&name) else {
                return Reply::Payload(value);
            };
            match value {
                Value::Array(items) => Reply::Payload(Value::Array(
                    items.into_iter().filter(|item| filter(arg, item)).collect(),
                )),
                other => Reply::Payload(other),
            }
        }));
        self
    }

    /// Filter index results by membership of the item's `name` field in
    /// the comma-separated query argument (`?id=1,3`). Chainable.
    pub fn add_index_array_filter(&self, name: &str) -> &Self {
        let field = name.to_string();
        self.add_index_filter_with(name, move |arg, item| {
            let Some(candidate) = field_as_string(item, &field) else {
                return false;
            };
            arg.split(',').any(|wanted| wanted == candidate)
        })
    }

    /// Paginate index results: skip applies before limit, each driven by
    /// its configured query parameter and only by a parseable non-zero
    /// integer. Chainable.
    pub fn add_index_pagination(&self) -> &Self {
        let inner = Rc::downgrade(&self.inner);
        self.index_handle().add_post_proc(Rc::new(move |value, request| {
            let Some(inner) = inner.upgrade() else {
                return Reply::Payload(value);
            };
            let Value::Array(items) = value else {
                return Reply::Payload(value);
            };
            let options = inner.router.options();
            let skip = page_argument(&options.skip_argument_name, request);
            let limit = page_argument(&options.limit_argument_name, request);

            let mut items: Vec<Value> = match skip {
                Some(n) => items.into_iter().skip(n).collect(),
                None => items,
            };
            if let Some(n) = limit {
                items.truncate(n);
            }
            Reply::Payload(Value::Array(items))
        }));
        self
    }

    fn index_handle(&self) -> RouteHandle {
        self.inner
            .index_route
            .borrow()
            .as_ref()
            .expect("index route registered at construction")
            .clone()
    }

    fn register(
        &self,
        method: HttpMethod,
        sub_pattern: &str,
        default: DefaultAction,
        pick: fn(&Overrides) -> Option<ActionFn>,
    ) -> Result<RouteHandle, ConfigError> {
        let weak = Rc::downgrade(&self.inner);
        self.inner.router.route(
            method,
            sub_pattern,
            Rc::new(move |request| {
                let inner = weak.upgrade()?;
                let store = ResourceStore { inner };
                // Clone the override out so the slot is not borrowed
                // while the action runs
                let action = pick(&store.inner.overrides.borrow());
                match action {
                    Some(action) => action(&store, request, default),
                    None => default(&store, request),
                }
            }),
        )
    }

    fn install_labellers(&self, index: &RouteHandle, singletons: &[RouteHandle]) {
        let weak = Rc::downgrade(&self.inner);
        index.set_finalizer(Rc::new(move |value, _| {
            let label = weak
                .upgrade()
                .and_then(|i| i.router.options().collection_label);
            Reply::Payload(envelope_under(label, value))
        }));
        for handle in singletons {
            let weak = Rc::downgrade(&self.inner);
            handle.set_finalizer(Rc::new(move |value, _| {
                let label = weak
                    .upgrade()
                    .and_then(|i| i.router.options().singleton_label);
                Reply::Payload(envelope_under(label, value))
            }));
        }
    }
}

fn default_index(store: &ResourceStore, request: &RequestEnvelope) -> Option<Reply> {
    let storage = store.inner.storage.borrow();
    let container = resolve(&storage, &request.path_args)?;
    let entries = container.as_object()?;

    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort_by(|a, b| key_order(a, b));
    let items = keys.into_iter().map(|key| entries[key].clone()).collect();
    Some(Reply::Payload(Value::Array(items)))
}

fn default_show(store: &ResourceStore, request: &RequestEnvelope) -> Option<Reply> {
    let storage = store.inner.storage.borrow();
    let item = resolve(&storage, &request.path_args)?;
    Some(Reply::Payload(item.clone()))
}

fn default_create(store: &ResourceStore, request: &RequestEnvelope) -> Option<Reply> {
    let Some(mut item) = body_object(request) else {
        return Some(Reply::Error(HttpError::bad_request()));
    };

    // Pseudo-random id; collisions are an accepted risk at mock scale
    let id: u32 = rand::random();
    item.insert("id".to_string(), json!(id));

    let mut storage = store.inner.storage.borrow_mut();
    let container = resolve_mut(&mut storage, &request.path_args, true)?;
    container
        .as_object_mut()?
        .insert(id.to_string(), Value::Object(item.clone()));
    Some(Reply::Payload(Value::Object(item)))
}

fn default_update(store: &ResourceStore, request: &RequestEnvelope) -> Option<Reply> {
    let (item_key, parent_args) = request.path_args.split_last()?;
    let Some(mut item) = body_object(request) else {
        return Some(Reply::Error(HttpError::bad_request()));
    };

    let mut storage = store.inner.storage.borrow_mut();
    let container = resolve_mut(&mut storage, parent_args, false)?;
    let entries = container.as_object_mut()?;
    let existing = entries.get(item_key)?;

    // The stored id always wins over a client-sent one
    match existing.get("id") {
        Some(id) => {
            item.insert("id".to_string(), id.clone());
        }
        None => {
            item.remove("id");
        }
    }
    entries.insert(item_key.clone(), Value::Object(item.clone()));
    Some(Reply::Payload(Value::Object(item)))
}

fn default_delete(store: &ResourceStore, request: &RequestEnvelope) -> Option<Reply> {
    let (item_key, parent_args) = request.path_args.split_last()?;
    let mut storage = store.inner.storage.borrow_mut();
    let container = resolve_mut(&mut storage, parent_args, false)?;
    let removed = container.as_object_mut()?.remove(item_key)?;
    Some(Reply::Payload(removed))
}

fn body_object(request: &RequestEnvelope) -> Option<Map<String, Value>> {
    request.body.as_ref()?.as_object().cloned()
}

fn resolve<'a>(root: &'a Value, keys: &[String]) -> Option<&'a Value> {
    keys.iter()
        .try_fold(root, |current, key| current.as_object()?.get(key))
}

fn resolve_mut<'a>(root: &'a mut Value, keys: &[String], auto_create: bool) -> Option<&'a mut Value> {
    let mut current = root;
    for key in keys {
        let entries = current.as_object_mut()?;
        if !entries.contains_key(key) {
            if !auto_create {
                return None;
            }
            entries.insert(key.clone(), Value::Object(Map::new()));
        }
        current = entries.get_mut(key)?;
    }
    Some(current)
}

/// All-digit keys sort numerically (and ahead of other keys), everything
/// else lexicographically, so `"10"` lands after `"2"`.
fn key_order(a: &str, b: &str) -> Ordering {
    match (numeric_key(a), numeric_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn numeric_key(key: &str) -> Option<u64> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

fn field_as_string(item: &Value, field: &str) -> Option<String> {
    match item.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn page_argument(name: &Option<String>, request: &RequestEnvelope) -> Option<usize> {
    let value = request.query.get(name.as_deref()?)?;
    value.parse().ok().filter(|n| *n != 0)
}

fn envelope_under(label: Option<String>, value: Value) -> Value {
    match label {
        Some(label) => {
            let mut wrapped = Map::new();
            wrapped.insert(label, value);
            Value::Object(wrapped)
        }
        None => value,
    }
}
