//! The signed-in user, if any.
//!
//! Sign-in itself happens outside the engine; the engine is only told who
//! signed in and when they sign out.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<UserProfile>,
}

impl Session {
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Replaces any current user.
    pub fn sign_in(&mut self, profile: UserProfile) {
        self.user = Some(profile);
    }

    /// Returns the user that was signed in.
    pub fn sign_out(&mut self) -> Option<UserProfile> {
        self.user.take()
    }
}
