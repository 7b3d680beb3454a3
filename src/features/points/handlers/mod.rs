mod points_handler;

pub use points_handler::*;
