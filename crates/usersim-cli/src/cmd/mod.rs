pub mod action;
pub mod simulate;
pub mod test_actions;
