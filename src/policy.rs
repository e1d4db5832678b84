// src/policy.rs

//! Who may do what.
//!
//! Every mutation handler asks [`authorize`] before touching the store. The
//! rules are pure functions of the acting identity and the target owner, so
//! they are tested here without a database.

use crate::error::AppError;

/// The identity recovered from a verified session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub is_admin: bool,
}

/// An operation together with the identity that owns its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Editing profile fields. Admins get no override here.
    UpdateUser { target: i64 },
    DeleteUser { target: i64 },
    ListUsers,
    CreatePost,
    UpdatePost { owner: i64 },
    DeletePost { owner: i64 },
    /// `claimed` is the user id sent in the request body.
    CreateComment { claimed: i64 },
    EditComment { author: i64 },
    DeleteComment { author: i64 },
    ListComments,
    LikeComment,
}

impl Action {
    fn denial(&self) -> &'static str {
        match self {
            Action::UpdateUser { .. } => "You are not allowed to update this user",
            Action::DeleteUser { .. } => "You are not allowed to delete this user",
            Action::ListUsers => "You are not allowed to see all users",
            Action::CreatePost => "You are not allowed to create a post",
            Action::UpdatePost { .. } => "You are not allowed to update this post",
            Action::DeletePost { .. } => "You are not allowed to delete this post",
            Action::CreateComment { .. } => "You are not allowed to create this comment",
            Action::EditComment { .. } => "You are not allowed to edit this comment",
            Action::DeleteComment { .. } => "You are not allowed to delete this comment",
            Action::ListComments => "You are not allowed to see all comments",
            Action::LikeComment => "You are not allowed to like this comment",
        }
    }
}

/// Returns true when `actor` may perform `action`.
pub fn is_allowed(actor: &Actor, action: Action) -> bool {
    match action {
        Action::UpdateUser { target } => actor.id == target,
        Action::CreateComment { claimed } => actor.id == claimed,
        Action::EditComment { author } => actor.id == author,

        Action::DeleteUser { target } => actor.is_admin || actor.id == target,
        Action::UpdatePost { owner } | Action::DeletePost { owner } => {
            actor.is_admin || actor.id == owner
        }
        Action::DeleteComment { author } => actor.is_admin || actor.id == author,

        Action::ListUsers | Action::ListComments | Action::CreatePost => actor.is_admin,

        Action::LikeComment => true,
    }
}

/// Like [`is_allowed`], but produces the 403 the handler should return.
pub fn authorize(actor: &Actor, action: Action) -> Result<(), AppError> {
    if is_allowed(actor, action) {
        Ok(())
    } else {
        tracing::warn!(actor = actor.id, ?action, "authorization denied");
        Err(AppError::Forbidden(action.denial().to_string()))
    }
}
