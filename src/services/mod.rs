// Core booking logic
pub mod availability;
pub mod code_generator;
pub mod orders;
pub mod revalidation;

// Document generation
pub mod documents;

// Notification fan-out
pub mod notification_dispatcher;

// Reference data
pub mod catalog;
