//! The durable queue's worker loop: one atomic step (`run_next_queued`),
//! a polling loop that repeats it (`run_forever`), and a sweeper that
//! recovers jobs stranded in `running` after a crash (`sweep_stranded`).

mod step;
mod worker;

pub use step::QueueStepOutcome;
pub use worker::WorkerLoop;
