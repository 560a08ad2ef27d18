pub mod admin_handlers;
pub mod health;
pub mod point_handlers;
