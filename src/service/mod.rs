//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services validate against repositories, mutate, then publish a
//! notification without waiting for it. The caller's account id is always
//! passed in explicitly.

mod account;
mod comment;
mod content;
mod interaction;
mod post;

#[cfg(test)]
pub(crate) mod test_support;

pub use account::AccountGraphService;
pub use comment::CommentService;
pub use interaction::InteractionService;
pub use post::PostService;
