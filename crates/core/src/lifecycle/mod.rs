//! One-shot initialization and disposal, and the running scope the host drives.

pub mod disposable;
pub mod initializable;
pub mod root;
pub mod scope;

pub use disposable::DisposableManager;
pub use initializable::InitializableManager;
pub use root::{DependencyRoot, StandardDependencyRoot};
pub use scope::RootScope;
