pub mod ticket;
pub mod guild;
pub mod transcript;

pub use ticket::{NewTicket, TicketStore};
pub use guild::GuildConfigProvider;
pub use transcript::TranscriptRecorder;
