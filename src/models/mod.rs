pub mod alert;
pub mod location;
pub mod order;
