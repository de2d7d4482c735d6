pub mod clock;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod euclid;
pub mod groove;
pub mod interval;
pub mod pattern;
pub mod queue;
pub mod scheduler;
pub mod sim;
pub mod tuning;

pub use clock::*;
pub use coordinator::*;
pub use error::*;
pub use euclid::*;
pub use groove::*;
pub use interval::*;
pub use pattern::*;
pub use queue::*;
pub use scheduler::*;
pub use tuning::*;
