//! Admin review moderation.

use serde::{Deserialize, Serialize};

use super::endpoint::{ApiRequest, MutationEndpoint, QueryEndpoint};
use super::types::Review;
use crate::cache::{PageRequest, PageResponse, Paginated, Tag};
use crate::error::ApiResult;

pub const REVIEWS: &str = "Reviews";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSearchArgs {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub keyword: Option<String>,
  #[serde(flatten)]
  pub page: PageRequest,
}

/// Paged review table; each page is its own cache entry.
pub struct SearchReviews;

impl QueryEndpoint for SearchReviews {
  const NAME: &'static str = "searchReviews";

  type Args = ReviewSearchArgs;
  type Response = PageResponse<Review>;
  type Output = Paginated<Review>;

  fn request(args: &Self::Args) -> ApiResult<ApiRequest> {
    Ok(
      ApiRequest::get(["admin", "reviews", "search"])
        .query_opt("keyword", args.keyword.as_deref())
        .page(&args.page),
    )
  }

  fn transform(response: Self::Response) -> Self::Output {
    response.into()
  }

  fn provides_tags(_args: &Self::Args, output: &Self::Output) -> Vec<Tag> {
    std::iter::once(Tag::list(REVIEWS))
      .chain(output.content.iter().map(|review| Tag::item(REVIEWS, &review.id)))
      .collect()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRef {
  pub id: String,
}

pub struct ToggleReviewVisibility;

impl MutationEndpoint for ToggleReviewVisibility {
  const NAME: &'static str = "toggleReviewVisibility";

  type Args = ReviewRef;
  type Output = Review;

  fn request(args: &Self::Args) -> ApiResult<ApiRequest> {
    Ok(ApiRequest::patch(["admin", "reviews", args.id.as_str(), "visibility"]))
  }

  fn invalidates_tags(args: &Self::Args, _output: &Self::Output) -> Vec<Tag> {
    vec![Tag::item(REVIEWS, &args.id)]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn review(id: &str) -> Review {
    Review {
      id: id.to_string(),
      movie_title: "Heat".to_string(),
      username: "ada".to_string(),
      rating: Some(5),
      content: String::new(),
      is_hidden: false,
      created_at: None,
    }
  }

  #[test]
  fn test_rows_provide_item_tags() {
    let args = ReviewSearchArgs {
      keyword: None,
      page: PageRequest::first(20),
    };
    let output = Paginated {
      content: vec![review("1"), review("2")],
      ..Paginated::default()
    };
    assert_eq!(
      SearchReviews::provides_tags(&args, &output),
      vec![
        Tag::list(REVIEWS),
        Tag::item(REVIEWS, "1"),
        Tag::item(REVIEWS, "2")
      ]
    );
  }

  #[test]
  fn test_search_request() {
    let args = ReviewSearchArgs {
      keyword: Some("heat".to_string()),
      page: PageRequest::first(20).next(),
    };
    let request = SearchReviews::request(&args).unwrap();
    assert_eq!(request.to_string(), "GET /admin/reviews/search");
    assert_eq!(request.query[0], ("keyword".to_string(), "heat".to_string()));
    assert_eq!(request.query[1], ("page".to_string(), "1".to_string()));
  }

  #[test]
  fn test_toggle_targets_one_row() {
    let args = ReviewRef { id: "2".to_string() };
    let request = ToggleReviewVisibility::request(&args).unwrap();
    assert_eq!(request.to_string(), "PATCH /admin/reviews/2/visibility");
    assert_eq!(
      ToggleReviewVisibility::invalidates_tags(&args, &review("2")),
      vec![Tag::item(REVIEWS, "2")]
    );
  }
}
