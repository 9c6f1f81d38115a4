//! Movie comments: an infinite list plus the writes that change it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::endpoint::{ApiRequest, MutationEndpoint, QueryEndpoint};
use super::types::Comment;
use crate::cache::paginate::{self, PageRequest, PageResponse, Paginated};
use crate::cache::Tag;
use crate::error::ApiResult;

pub const COMMENTS: &str = "Comments";
pub const DEFAULT_SORT: &str = "createdAt,desc";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieCommentsArgs {
  pub movie_id: String,
  #[serde(flatten)]
  pub page: PageRequest,
}

impl MovieCommentsArgs {
  pub fn first_page(movie_id: impl Into<String>, size: u32) -> Self {
    Self {
      movie_id: movie_id.into(),
      page: PageRequest::first(size).with_sort(DEFAULT_SORT),
    }
  }

  pub fn next_page(&self) -> Self {
    Self {
      movie_id: self.movie_id.clone(),
      page: self.page.next(),
    }
  }
}

/// Comments of one movie. Every page lands in the same cache entry and is
/// appended to the pages already loaded.
pub struct ListMovieComments;

impl QueryEndpoint for ListMovieComments {
  const NAME: &'static str = "listMovieComments";

  type Args = MovieCommentsArgs;
  type Response = PageResponse<Comment>;
  type Output = Paginated<Comment>;

  fn request(args: &Self::Args) -> ApiResult<ApiRequest> {
    Ok(ApiRequest::get(["comments", "movie", args.movie_id.as_str()]).page(&args.page))
  }

  fn transform(response: Self::Response) -> Self::Output {
    response.into()
  }

  fn provides_tags(args: &Self::Args, _output: &Self::Output) -> Vec<Tag> {
    vec![Tag::item(COMMENTS, &args.movie_id)]
  }

  fn cache_args(args: &Self::Args) -> serde_json::Result<Value> {
    Ok(paginate::args_without_page(serde_json::to_value(args)?))
  }

  fn merge(existing: Option<Self::Output>, incoming: Self::Output, args: &Self::Args) -> Self::Output {
    paginate::merge(existing, incoming, args.page.page)
  }

  fn force_refetch(args: &Self::Args, previous: Option<&Self::Args>) -> bool {
    previous.is_some_and(|previous| previous.page.page != args.page.page)
  }

  fn refetch_args(args: Self::Args) -> Self::Args {
    Self::Args {
      page: PageRequest {
        page: 1,
        ..args.page
      },
      ..args
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
  pub movie_id: String,
  pub content: String,
}

pub struct CreateComment;

impl MutationEndpoint for CreateComment {
  const NAME: &'static str = "createComment";

  type Args = NewComment;
  type Output = Comment;

  fn request(args: &Self::Args) -> ApiResult<ApiRequest> {
    ApiRequest::post(["comments"]).json(args)
  }

  fn invalidates_tags(args: &Self::Args, _output: &Self::Output) -> Vec<Tag> {
    vec![Tag::item(COMMENTS, &args.movie_id)]
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRef {
  pub id: String,
  /// Movie whose list must be refreshed; not sent to the backend
  #[serde(skip)]
  pub movie_id: String,
}

pub struct DeleteComment;

impl MutationEndpoint for DeleteComment {
  const NAME: &'static str = "deleteComment";

  type Args = CommentRef;
  type Output = Value;

  fn request(args: &Self::Args) -> ApiResult<ApiRequest> {
    Ok(ApiRequest::delete(["comments", args.id.as_str()]))
  }

  fn invalidates_tags(args: &Self::Args, _output: &Self::Output) -> Vec<Tag> {
    vec![Tag::item(COMMENTS, &args.movie_id)]
  }
}
