//! End-to-end engine tests

mod caller_tests;
mod register_tests;
mod release_tests;
mod session_tests;
mod update_tests;
