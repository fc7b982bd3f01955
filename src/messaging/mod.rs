//! # Messaging Module
//!
//! Queue adapter contract plus the pieces built on it: per-consumer sessions with
//! scoped channel subscriptions, the bounded enqueue-retry policy, and an
//! in-memory backend used by tests and the demo binary.

pub mod enqueue;
pub mod errors;
pub mod in_memory;
pub mod message;
pub mod session;
pub mod traits;

pub use enqueue::{enqueue_with_retry, MAX_ENQUEUE_ATTEMPTS};
pub use errors::{MessagingError, MessagingResult};
pub use in_memory::InMemoryQueue;
pub use message::{MessageId, ReservedMessage};
pub use session::{QueueSession, Subscription};
pub use traits::MessageQueue;
