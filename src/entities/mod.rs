pub mod beo;
pub mod beo_attachment;
pub mod beo_file;
pub mod beo_file_sequence;
pub mod customer;
pub mod department;
pub mod event;
pub mod notification;
pub mod order;
pub mod order_attachment;
pub mod order_venue;
pub mod package;
pub mod schedule;
pub mod user;
pub mod user_role;
pub mod venue;
