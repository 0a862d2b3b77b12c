use time::OffsetDateTime;

use crate::domain::user::User;

/// One side of a follow edge, joined to the user on the other end.
#[derive(Debug, Clone)]
pub struct FollowEdge {
    pub user: User,
    pub followed_at: OffsetDateTime,
}
