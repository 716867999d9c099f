use crate::error::{InvokeError, PoolError};
use crate::value::{FromValue, ParamKind, Value};

use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;

type Invoke = dyn Fn(&[Value]) -> Result<Vec<Value>, InvokeError> + Send + Sync + 'static;

/// A callable of statically unknown shape, with the parameter types and
/// return count it declared when it was built.
#[derive(Clone)]
pub struct Function {
  params: Arc<[ParamKind]>,
  returns: usize,
  type_name: &'static str,
  invoke: Arc<Invoke>,
}

impl Function {
  /// Builds a function returning one value. A `()` return produces no values.
  pub fn new<F, Args, R>(f: F) -> Self
  where
    F: Callable<Args, R>,
    Args: 'static,
    R: Send + Sync + 'static,
  {
    let returns = if TypeId::of::<R>() == TypeId::of::<()>() { 0 } else { 1 };
    Self {
      params: F::params().into(),
      returns,
      type_name: type_name::<F>(),
      invoke: Arc::new(move |args: &[Value]| {
        let ret = f.apply(args)?;
        Ok(if returns == 0 { Vec::new() } else { vec![Value::new(ret)] })
      }),
    }
  }

  /// Builds a function whose tuple return is spread into ordered values.
  pub fn multi<F, Args, R>(f: F) -> Self
  where
    F: Callable<Args, R>,
    Args: 'static,
    R: Returns,
  {
    Self {
      params: F::params().into(),
      returns: R::COUNT,
      type_name: type_name::<F>(),
      invoke: Arc::new(move |args: &[Value]| f.apply(args).map(Returns::into_values)),
    }
  }

  pub fn params(&self) -> &[ParamKind] {
    &self.params
  }

  pub fn returns(&self) -> usize {
    self.returns
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  /// Checks that `args` can be applied: exact count, then per position
  /// either the identical concrete type or an advertised capability.
  pub fn check_args(&self, args: &[Value]) -> Result<(), PoolError> {
    if args.len() != self.params.len() {
      return Err(PoolError::ArityMismatch {
        expected: self.params.len(),
        provided: args.len(),
      });
    }
    for (position, (kind, arg)) in self.params.iter().zip(args).enumerate() {
      match *kind {
        ParamKind::Concrete { type_id, type_name } => {
          if arg.type_id() != Some(type_id) {
            return Err(PoolError::TypeMismatch {
              position,
              expected: type_name,
              found: arg.type_name(),
            });
          }
        }
        ParamKind::Capability { type_id, type_name } => {
          if !arg.satisfies(type_id) {
            return Err(PoolError::CapabilityNotSatisfied {
              position,
              capability: type_name,
              found: arg.type_name(),
            });
          }
        }
      }
    }
    Ok(())
  }

  /// Applies `args` and returns the values in declared order.
  pub fn call(&self, args: &[Value]) -> Result<Vec<Value>, InvokeError> {
    (self.invoke)(args)
  }
}

impl fmt::Debug for Function {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Function")
      .field("type_name", &self.type_name)
      .field("params", &self.params)
      .field("returns", &self.returns)
      .finish_non_exhaustive()
  }
}

/// Implemented for closures of arity 0..=6 whose parameters are all
/// [`FromValue`]. `Args` is the parameter tuple, `R` the raw return type.
pub trait Callable<Args, R>: Send + Sync + 'static {
  fn params() -> Vec<ParamKind>;

  fn apply(&self, args: &[Value]) -> Result<R, InvokeError>;
}

/// Tuple returns spread into one value per element.
pub trait Returns: Send + Sync + 'static {
  const COUNT: usize;

  fn into_values(self) -> Vec<Value>;
}

macro_rules! count {
  () => { 0usize };
  ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_callable {
  ($($arg:ident),*) => {
    impl<F, R, $($arg,)*> Callable<($($arg,)*), R> for F
    where
      F: Fn($($arg),*) -> R + Send + Sync + 'static,
      $($arg: FromValue,)*
    {
      fn params() -> Vec<ParamKind> {
        vec![$(<$arg as FromValue>::kind()),*]
      }

      #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
      fn apply(&self, args: &[Value]) -> Result<R, InvokeError> {
        let expected = count!($($arg)*);
        if args.len() != expected {
          return Err(InvokeError::Arity { expected, provided: args.len() });
        }
        let mut position = 0usize;
        $(
          let value = &args[position];
          let $arg = <$arg as FromValue>::from_value(value).ok_or_else(|| InvokeError::Extract {
            position,
            expected: type_name::<$arg>(),
            found: value.type_name(),
          })?;
          position += 1;
        )*
        Ok((self)($($arg),*))
      }
    }
  };
}

impl_callable!();
impl_callable!(A1);
impl_callable!(A1, A2);
impl_callable!(A1, A2, A3);
impl_callable!(A1, A2, A3, A4);
impl_callable!(A1, A2, A3, A4, A5);
impl_callable!(A1, A2, A3, A4, A5, A6);

macro_rules! impl_returns {
  ($($ret:ident),*) => {
    impl<$($ret,)*> Returns for ($($ret,)*)
    where
      $($ret: Send + Sync + 'static,)*
    {
      const COUNT: usize = count!($($ret)*);

      #[allow(non_snake_case)]
      fn into_values(self) -> Vec<Value> {
        let ($($ret,)*) = self;
        vec![$(Value::new($ret)),*]
      }
    }
  };
}

impl_returns!();
impl_returns!(R1);
impl_returns!(R1, R2);
impl_returns!(R1, R2, R3);
impl_returns!(R1, R2, R3, R4);
