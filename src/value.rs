use crate::function::{Callable, Function, Returns};

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

type Erased = Arc<dyn Any + Send + Sync>;

const NIL_TYPE_NAME: &str = "<nil>";

/// A type-erased, cheaply clonable value handed to or returned from a
/// registered callable.
///
/// Besides its payload, a value may advertise capabilities: trait objects it
/// can be viewed as. Parameters declared as [`Cap<C>`] accept any value that
/// advertises `C`.
#[derive(Clone, Default)]
pub struct Value {
  inner: Option<Payload>,
}

#[derive(Clone)]
struct Payload {
  data: Erased,
  type_id: TypeId,
  type_name: &'static str,
  capabilities: Arc<HashMap<TypeId, Erased>>,
}

impl Value {
  /// The nil value. It has no type, so it matches no declared parameter.
  pub fn nil() -> Self {
    Self { inner: None }
  }

  pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
    Self::builder(value).build()
  }

  /// Starts building a value that advertises one or more capabilities.
  pub fn builder<T: Send + Sync + 'static>(value: T) -> ValueBuilder<T> {
    ValueBuilder {
      value: Arc::new(value),
      capabilities: HashMap::new(),
    }
  }

  /// Wraps a callable returning a single value (or nothing, for `()`).
  ///
  /// A returned tuple is stored as one result; use [`Value::func_multi`] to
  /// get one result per tuple element.
  pub fn func<F, Args, R>(f: F) -> Self
  where
    F: Callable<Args, R>,
    Args: 'static,
    R: Send + Sync + 'static,
  {
    Self::new(Function::new(f))
  }

  /// Wraps a callable whose tuple return is spread into ordered results.
  pub fn func_multi<F, Args, R>(f: F) -> Self
  where
    F: Callable<Args, R>,
    Args: 'static,
    R: Returns,
  {
    Self::new(Function::multi(f))
  }

  pub fn is_nil(&self) -> bool {
    self.inner.is_none()
  }

  /// The `TypeId` of the concrete payload, `None` for nil.
  pub fn type_id(&self) -> Option<TypeId> {
    self.inner.as_ref().map(|p| p.type_id)
  }

  pub fn type_name(&self) -> &'static str {
    self.inner.as_ref().map_or(NIL_TYPE_NAME, |p| p.type_name)
  }

  pub fn is<T: 'static>(&self) -> bool {
    self.type_id() == Some(TypeId::of::<T>())
  }

  pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
    self.inner.as_ref().and_then(|p| p.data.downcast_ref::<T>())
  }

  /// Views the value through capability `C`, if it advertises it.
  pub fn capability<C: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<C>> {
    self
      .inner
      .as_ref()
      .and_then(|p| p.capabilities.get(&TypeId::of::<C>()))
      .and_then(|erased| erased.downcast_ref::<Arc<C>>())
      .cloned()
  }

  pub(crate) fn satisfies(&self, capability: TypeId) -> bool {
    self
      .inner
      .as_ref()
      .is_some_and(|p| p.capabilities.contains_key(&capability))
  }

  pub(crate) fn as_function(&self) -> Option<&Function> {
    self.downcast_ref::<Function>()
  }
}

impl From<Function> for Value {
  fn from(function: Function) -> Self {
    Value::new(function)
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.inner {
      None => f.write_str(NIL_TYPE_NAME),
      Some(payload) => f
        .debug_struct("Value")
        .field("type_name", &payload.type_name)
        .field("capabilities", &payload.capabilities.len())
        .finish_non_exhaustive(),
    }
  }
}

/// Builder returned by [`Value::builder`].
pub struct ValueBuilder<T> {
  value: Arc<T>,
  capabilities: HashMap<TypeId, Erased>,
}

impl<T: Send + Sync + 'static> ValueBuilder<T> {
  /// Advertises capability `C`. `cast` is usually an unsizing coercion,
  /// e.g. `|user| user as Arc<dyn Named>`.
  pub fn capability<C: ?Sized + Send + Sync + 'static>(mut self, cast: impl FnOnce(Arc<T>) -> Arc<C>) -> Self {
    let view: Arc<C> = cast(self.value.clone());
    self.capabilities.insert(TypeId::of::<C>(), Arc::new(view));
    self
  }

  pub fn build(self) -> Value {
    Value {
      inner: Some(Payload {
        data: self.value,
        type_id: TypeId::of::<T>(),
        type_name: type_name::<T>(),
        capabilities: Arc::new(self.capabilities),
      }),
    }
  }
}

/// The declared type of one callable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
  /// The argument's concrete type must be exactly this one.
  Concrete { type_id: TypeId, type_name: &'static str },
  /// The argument must advertise this capability.
  Capability { type_id: TypeId, type_name: &'static str },
}

impl ParamKind {
  pub fn type_name(&self) -> &'static str {
    match self {
      ParamKind::Concrete { type_name, .. } | ParamKind::Capability { type_name, .. } => type_name,
    }
  }
}

/// Extraction of a typed callable argument from a [`Value`].
pub trait FromValue: Sized {
  fn kind() -> ParamKind;

  fn from_value(value: &Value) -> Option<Self>;
}

impl<T: Clone + Send + Sync + 'static> FromValue for T {
  fn kind() -> ParamKind {
    ParamKind::Concrete {
      type_id: TypeId::of::<T>(),
      type_name: type_name::<T>(),
    }
  }

  fn from_value(value: &Value) -> Option<Self> {
    value.downcast_ref::<T>().cloned()
  }
}

/// A parameter that accepts any value advertising capability `C`.
///
/// ```ignore
/// Value::func(|who: Cap<dyn Named>| who.name())
/// ```
pub struct Cap<C: ?Sized>(Arc<C>);

impl<C: ?Sized> Cap<C> {
  pub fn into_inner(self) -> Arc<C> {
    self.0
  }
}

impl<C: ?Sized> Deref for Cap<C> {
  type Target = C;

  fn deref(&self) -> &C {
    &self.0
  }
}

impl<C: ?Sized + Send + Sync + 'static> FromValue for Cap<C> {
  fn kind() -> ParamKind {
    ParamKind::Capability {
      type_id: TypeId::of::<C>(),
      type_name: type_name::<C>(),
    }
  }

  fn from_value(value: &Value) -> Option<Self> {
    value.capability::<C>().map(Cap)
  }
}
