pub mod admin_dto;
pub mod telegram_dto;
