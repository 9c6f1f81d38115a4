//! Signed-in user.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
  #[default]
  User,
  Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
  pub id: String,
  pub username: String,
  #[serde(default)]
  pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
  pub is_authenticated: bool,
  pub user: Option<SessionUser>,
}

impl AuthState {
  pub fn is_admin(&self) -> bool {
    self
      .user
      .as_ref()
      .is_some_and(|user| user.role == Role::Admin)
  }
}

#[derive(Clone)]
pub struct AuthSlice {
  state: Arc<watch::Sender<AuthState>>,
}

impl Default for AuthSlice {
  fn default() -> Self {
    Self::new()
  }
}

impl AuthSlice {
  pub fn new() -> Self {
    let (state, _) = watch::channel(AuthState::default());
    Self {
      state: Arc::new(state),
    }
  }

  pub fn sign_in(&self, user: SessionUser) {
    info!(user = %user.username, role = ?user.role, "signed in");
    self.state.send_replace(AuthState {
      is_authenticated: true,
      user: Some(user),
    });
  }

  pub fn sign_out(&self) {
    info!("signed out");
    self.state.send_replace(AuthState::default());
  }

  pub fn current(&self) -> AuthState {
    self.state.borrow().clone()
  }

  pub fn watch(&self) -> watch::Receiver<AuthState> {
    self.state.subscribe()
  }
}
