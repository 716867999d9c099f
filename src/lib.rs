//! A Tokio-based pool that registers type-checked callables together with
//! their arguments, launches all of them at once, and waits for a chosen
//! subset under a deadline or cancellation signal.

mod context;
mod error;
mod function;
mod handle;
mod manager;
mod task;
mod value;
mod wait_group;

pub use context::RunContext;
pub use error::{InvokeError, PoolError};
pub use function::{Callable, Function, Returns};
pub use handle::TaskId;
pub use manager::WorkerPool;
pub use value::{Cap, FromValue, ParamKind, Value, ValueBuilder};
