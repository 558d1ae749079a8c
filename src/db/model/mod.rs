pub mod ticket;
pub mod guild;
pub mod transcript;
