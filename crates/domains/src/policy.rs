//! # Role Policy
//!
//! Pure decision function mapping `(role, action, context)` to allow/deny.
//! Holds no state and performs no I/O; the engine consults it before
//! every mutation and never touches the store after a denial.
//!
//! | Action | Allowed roles |
//! |---|---|
//! | read category/topic/post | anyone, including anonymous |
//! | create topic | user, moderator, admin, owner |
//! | create post | user, moderator, admin, owner (topic must be unlocked) |
//! | pin/unpin, lock/unlock topic | moderator, admin, owner |
//! | change another user's role | admin, owner (never to or from owner) |
//! | view admin user list | admin, owner |

use serde::Serialize;

use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    ReadContent,
    CreateTopic,
    CreatePost,
    PinTopic,
    LockTopic,
    ChangeRole,
    ViewUserList,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::ReadContent,
        Action::CreateTopic,
        Action::CreatePost,
        Action::PinTopic,
        Action::LockTopic,
        Action::ChangeRole,
        Action::ViewUserList,
    ];
}

/// A requested role change, as seen by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChange {
    pub current: Role,
    pub requested: Role,
    /// Caller and target are the same user.
    pub is_self: bool,
}

/// Facts about the target that some rules depend on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyContext {
    pub topic_locked: bool,
    pub role_change: Option<RoleChange>,
}

impl PolicyContext {
    pub fn topic(locked: bool) -> Self {
        Self {
            topic_locked: locked,
            role_change: None,
        }
    }

    pub fn role_change(change: RoleChange) -> Self {
        Self {
            topic_locked: false,
            role_change: Some(change),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Denial {
    Unauthenticated,
    InsufficientRole,
    TopicLocked,
    SelfRoleChange,
    OwnerImmutable,
    OwnerUnassignable,
}

impl Denial {
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::Unauthenticated => "authentication required",
            Denial::InsufficientRole => "role does not permit this action",
            Denial::TopicLocked => "topic is locked",
            Denial::SelfRoleChange => "users cannot change their own role",
            Denial::OwnerImmutable => "the owner's role cannot be changed",
            Denial::OwnerUnassignable => "the owner role cannot be assigned",
        }
    }

    /// Denials caused by the target's state rather than the caller's privilege.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Denial::OwnerImmutable | Denial::OwnerUnassignable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decides whether `role` may perform `action`. `None` is an anonymous caller.
///
/// Total: every input combination yields a decision.
pub fn decide(role: Option<Role>, action: Action, ctx: &PolicyContext) -> Decision {
    if action == Action::ReadContent {
        return Decision::Allow;
    }
    let Some(role) = role else {
        return Decision::Deny(Denial::Unauthenticated);
    };

    match action {
        Action::ReadContent => Decision::Allow,
        Action::CreateTopic => Decision::Allow,
        Action::CreatePost if ctx.topic_locked => Decision::Deny(Denial::TopicLocked),
        Action::CreatePost => Decision::Allow,
        Action::PinTopic | Action::LockTopic => at_least(role, Role::Moderator),
        Action::ViewUserList => at_least(role, Role::Admin),
        Action::ChangeRole => decide_role_change(role, ctx.role_change),
    }
}

fn decide_role_change(role: Role, change: Option<RoleChange>) -> Decision {
    // Target-state guards run first so every authenticated caller sees the same answer.
    if let Some(change) = change {
        if change.current == Role::Owner {
            return Decision::Deny(Denial::OwnerImmutable);
        }
        if change.requested == Role::Owner {
            return Decision::Deny(Denial::OwnerUnassignable);
        }
        if change.is_self {
            return Decision::Deny(Denial::SelfRoleChange);
        }
    }
    at_least(role, Role::Admin)
}

fn at_least(role: Role, minimum: Role) -> Decision {
    if role >= minimum {
        Decision::Allow
    } else {
        Decision::Deny(Denial::InsufficientRole)
    }
}
