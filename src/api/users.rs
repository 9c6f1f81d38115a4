//! Admin user management and the signed-in user's profile.

use serde::{Deserialize, Serialize};

use super::endpoint::{ApiRequest, MutationEndpoint, QueryEndpoint};
use super::types::{UserProfile, UserStatus, UserSummary};
use crate::cache::{PageRequest, PageResponse, Paginated, Tag};
use crate::error::ApiResult;

pub const USERS: &str = "Users";
pub const USER_PROFILE: &str = "UserProfile";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchArgs {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub keyword: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<UserStatus>,
  #[serde(flatten)]
  pub page: PageRequest,
}

pub struct SearchUsers;

impl QueryEndpoint for SearchUsers {
  const NAME: &'static str = "searchUsers";

  type Args = UserSearchArgs;
  type Response = PageResponse<UserSummary>;
  type Output = Paginated<UserSummary>;

  fn request(args: &Self::Args) -> ApiResult<ApiRequest> {
    Ok(
      ApiRequest::get(["admin", "users", "search"])
        .query_opt("keyword", args.keyword.as_deref())
        .query_opt("status", args.status)
        .page(&args.page),
    )
  }

  fn transform(response: Self::Response) -> Self::Output {
    response.into()
  }

  fn provides_tags(_args: &Self::Args, output: &Self::Output) -> Vec<Tag> {
    std::iter::once(Tag::list(USERS))
      .chain(output.content.iter().map(|user| Tag::item(USERS, &user.id)))
      .collect()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
  #[serde(skip)]
  pub id: String,
  pub status: UserStatus,
}

pub struct UpdateUserStatus;

impl MutationEndpoint for UpdateUserStatus {
  const NAME: &'static str = "updateUserStatus";

  type Args = StatusChange;
  type Output = UserSummary;

  fn request(args: &Self::Args) -> ApiResult<ApiRequest> {
    ApiRequest::patch(["admin", "users", args.id.as_str(), "status"]).json(args)
  }

  fn invalidates_tags(args: &Self::Args, _output: &Self::Output) -> Vec<Tag> {
    vec![Tag::item(USERS, &args.id)]
  }
}

pub struct GetUserProfile;

impl QueryEndpoint for GetUserProfile {
  const NAME: &'static str = "getUserProfile";

  type Args = ();
  type Response = UserProfile;
  type Output = UserProfile;

  fn request(_args: &()) -> ApiResult<ApiRequest> {
    Ok(ApiRequest::get(["users", "profile"]))
  }

  fn transform(response: UserProfile) -> UserProfile {
    response
  }

  fn provides_tags(_args: &(), _output: &UserProfile) -> Vec<Tag> {
    vec![Tag::list(USER_PROFILE)]
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub full_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub avatar_url: Option<String>,
}

pub struct UpdateUserProfile;

impl MutationEndpoint for UpdateUserProfile {
  const NAME: &'static str = "updateUserProfile";

  type Args = ProfileUpdate;
  type Output = UserProfile;

  fn request(args: &Self::Args) -> ApiResult<ApiRequest> {
    ApiRequest::put(["users", "profile"]).json(args)
  }

  fn invalidates_tags(_args: &Self::Args, _output: &Self::Output) -> Vec<Tag> {
    vec![Tag::list(USER_PROFILE)]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_search_request_skips_empty_filters() {
    let args = UserSearchArgs {
      keyword: None,
      status: Some(UserStatus::Blocked),
      page: PageRequest::first(20),
    };
    let request = SearchUsers::request(&args).unwrap();
    assert_eq!(request.to_string(), "GET /admin/users/search");
    assert_eq!(request.query[0], ("status".to_string(), "BLOCKED".to_string()));
    assert!(!request.query.iter().any(|(name, _)| name == "keyword"));
  }

  #[test]
  fn test_status_change_body() {
    let args = StatusChange {
      id: "u7".to_string(),
      status: UserStatus::Blocked,
    };
    let request = UpdateUserStatus::request(&args).unwrap();
    assert_eq!(request.to_string(), "PATCH /admin/users/u7/status");
    assert_eq!(request.body, Some(json!({"status": "BLOCKED"})));
  }

  #[test]
  fn test_profile_update_body() {
    let update = ProfileUpdate {
      full_name: Some("Ada Lovelace".to_string()),
      ..ProfileUpdate::default()
    };
    let request = UpdateUserProfile::request(&update).unwrap();
    assert_eq!(request.to_string(), "PUT /users/profile");
    assert_eq!(request.body, Some(json!({"fullName": "Ada Lovelace"})));
  }
}
