//! Pure like/dislike toggle logic
//!
//! The catalog keeps a tri-state rating per track, but its read side is
//! lossy: `Liked` is reported faithfully while truly-neutral and disliked
//! tracks both come back as `Neutral`. The transition table below is written
//! so that toggling stays deterministic under that ambiguity. The accepted
//! consequence: disliking a track twice in a row (as observed through reads)
//! dislikes it again instead of toggling it off.
//!
//! This module is side-effect free. The daemon reads the current rating,
//! applies the transition, and writes the resulting upstream value back.

use serde::{Deserialize, Serialize};

/// Tri-state track rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Neutral,
    Liked,
    Disliked,
}

/// A user toggle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingAction {
    Like,
    Dislike,
}

/// Outcome of one transition: the state the machine lands in, and the value
/// to write upstream. The two are always equal in the current table but are
/// kept separate so callers never have to assume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingTransition {
    pub new_state: Rating,
    pub upstream: Rating,
}

impl Rating {
    /// Run one toggle action against the current state.
    pub fn apply(self, action: RatingAction) -> RatingTransition {
        use Rating::*;
        use RatingAction::*;

        let new_state = match (self, action) {
            (Neutral, Like) => Liked,
            (Neutral, Dislike) => Disliked,
            (Liked, Like) => Neutral,
            (Liked, Dislike) => Disliked,
            (Disliked, Like) => Liked,
            (Disliked, Dislike) => Neutral,
        };

        RatingTransition {
            new_state,
            upstream: new_state,
        }
    }
}
