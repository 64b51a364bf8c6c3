//! Session module - canonical conversation messages
//!
//! Every provider adapter translates to and from these types, so the
//! conversation engine never sees a vendor wire format.
//!
//! # Example
//!
//! ```
//! use parley::session::{ChatInput, Message, Role};
//!
//! let input: ChatInput = "Hello!".into();
//! let messages = input.into_messages();
//! assert_eq!(messages.len(), 1);
//! assert_eq!(messages[0].role, Role::User);
//!
//! let reply = Message::assistant("Hi there!");
//! assert_eq!(reply.text(), "Hi there!");
//! ```

pub mod types;

pub use types::{ChatInput, FunctionCall, Message, Role};
