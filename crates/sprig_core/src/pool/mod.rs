//! Object recycling for components, masks and entity ids.

mod recycle;

pub use recycle::RecyclePool;
