//! SMS gateway tests

mod twilio_tests;
