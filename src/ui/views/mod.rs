mod comments;
mod detail;
mod profile;
mod reviews;
#[cfg(test)]
mod testing;
mod users;

pub use comments::CommentsView;
pub use detail::DetailView;
pub use profile::ProfileView;
pub use reviews::ReviewsView;
pub use users::UsersView;

use marquee::QueryState;

/// Block title for a list backed by a query: count while idle, a marker
/// while loading, the error otherwise.
fn list_title(label: &str, state: &QueryState, shown: usize, total: u64) -> String {
  match state {
    QueryState::Loading => format!(" {} (loading...) ", label),
    QueryState::Error(e) => format!(" {} (error: {}) ", label, e),
    _ if total > shown as u64 => format!(" {} ({} of {}) ", label, shown, total),
    _ => format!(" {} ({}) ", label, shown),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use marquee::ApiError;

  #[test]
  fn test_list_title() {
    assert_eq!(list_title("Users", &QueryState::Success, 3, 3), " Users (3) ");
    assert_eq!(
      list_title("Comments [m1]", &QueryState::Success, 20, 51),
      " Comments [m1] (20 of 51) "
    );
    assert_eq!(list_title("Users", &QueryState::Loading, 0, 0), " Users (loading...) ");
    let failed = QueryState::Error(ApiError::service(500, "boom"));
    assert!(list_title("Users", &failed, 0, 0).starts_with(" Users (error: "));
  }
}
