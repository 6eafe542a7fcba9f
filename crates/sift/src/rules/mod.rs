//! Rule engine core: declarative rules, predicates, matching and identity

mod evaluate;
mod hash;
mod load;
mod model;
mod predicate;

pub use evaluate::{evaluate, field_value, matches};
pub use hash::RulesetHash;
pub use load::{load_rulesets, parse_rulesets};
pub use model::{Action, ActionKind, Condition, Field, Predicate, PredicateMode, RuleSet};
pub use predicate::{Clock, FixedClock, RECEIVED_AT_FORMAT, SystemClock, elapsed_days};
