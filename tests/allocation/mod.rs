//! BDD harness for the allocation workflow.

mod bdd_steps;
mod scenarios;
mod test_helpers;
