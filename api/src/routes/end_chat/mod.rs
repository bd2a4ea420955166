pub mod end_chat_route;
