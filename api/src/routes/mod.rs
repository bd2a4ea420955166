pub mod ask;
pub mod end_chat;
pub mod health;
pub mod index;
pub mod sessions;
pub mod ui;
pub mod upload;
