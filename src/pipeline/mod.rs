//! The detection pipeline: resolve → extract → diff → notify, driven by the
//! scheduler.
//!
//! - `resolve`: fill in option defaults and pick the operating mode
//! - `extract`: fetch the reference document and collect asset identifiers
//! - `diff`: compare against the baseline
//! - `notify`: ask whether to reload
//! - `schedule`: the self-rescheduling timer loop

pub mod diff;
pub mod extract;
pub mod notify;
pub mod resolve;
pub mod schedule;

pub use diff::{Change, compare, diff};
pub use extract::FingerprintExtractor;
pub use notify::{Callbacks, Decision, DetectedCallback, Notification, UpdateCallback};
pub use resolve::{Mode, ResolvedConfig, resolve};
pub use schedule::{Engine, Phase};
