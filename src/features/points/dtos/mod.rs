mod points_dto;

pub use points_dto::*;
