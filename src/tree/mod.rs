pub mod locks;
pub mod node;
pub mod selection;
pub mod state;
pub mod sync;
