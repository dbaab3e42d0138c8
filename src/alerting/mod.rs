pub mod decision;

pub use decision::{Classification, Decision, DecisionEngine, Evaluation, decide};
