// Status vocabulary and transition rules shared by task messages and jobs.
//
// Transitions are validated locally on the entity being mutated; the store only
// ever sees the resulting status string.

pub mod events;
pub mod states;

pub use events::TaskEvent;
pub use states::TaskStatus;
