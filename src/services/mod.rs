pub mod attempt_service;
pub mod scoring_service;
pub mod test_service;
