pub mod question;
pub mod test_attempt;
