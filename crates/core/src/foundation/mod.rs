pub mod lifecycle;
pub mod traits;

pub use lifecycle::LifecycleState;
pub use traits::{Disposable, FixedTickable, Initializable, InjectionTarget, LateTickable, Tickable};
