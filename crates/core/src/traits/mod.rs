pub mod resource_source;
pub mod resource_store;
pub mod session_source;
pub mod task_handler;
pub mod task_queue;

pub use resource_source::*;
pub use resource_store::*;
pub use session_source::*;
pub use task_handler::*;
pub use task_queue::*;
