pub mod blob;
pub mod content;
pub mod documents;
pub mod submissions;
pub mod users;
pub mod whitelist;
