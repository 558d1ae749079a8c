//! # Core library of the tickets bot
//!
//! ## Components system
//!
//! The bot is split into components. Each component owns its own state and receives every
//! gateway event through the [`ComponentEventDispatcher`] registered on the serenity client.
//!
//! Each component must implement the [`ComponentEvent`] trait; [`Component`] is implemented
//! for every such type.
//!
//! ## Messages
//!
//! [`message`] holds a platform-neutral description of the messages the bot sends
//! (content, embeds, buttons). It can be inspected in tests and converted into serenity
//! builders right before hitting the REST API.
//!
//! [`ComponentEventDispatcher`]: event::ComponentEventDispatcher

pub mod event;
pub mod container;
pub mod message;
use std::sync::Arc;

pub use event::ComponentEvent;
pub use container::ComponentContainer;

pub trait Component: ComponentEvent {}
impl<T: ComponentEvent> Component for T {}

pub type Components = Vec<Arc<dyn Component>>;
