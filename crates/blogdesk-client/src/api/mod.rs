//! Per-resource wrappers: one function, one HTTP verb and URL.

pub mod drafts;
pub mod query;
pub mod resource;
pub mod tokens;

pub use drafts::{ArticleDraft, CategoryDraft, TagDraft, TagRef, UserDraft};
pub use query::{ListQuery, SortDirection};
pub use resource::Resource;
pub use tokens::{Credentials, IssuedToken, LoginStyle, TokenApi};

use crate::dispatcher::RequestDispatcher;

pub fn articles(dispatcher: &RequestDispatcher) -> Resource<'_> {
    Resource::new(dispatcher, "articles", "article")
}

pub fn categories(dispatcher: &RequestDispatcher) -> Resource<'_> {
    Resource::new(dispatcher, "categories", "category")
}

pub fn tags(dispatcher: &RequestDispatcher) -> Resource<'_> {
    Resource::new(dispatcher, "tags", "tag")
}

pub fn roles(dispatcher: &RequestDispatcher) -> Resource<'_> {
    Resource::new(dispatcher, "roles", "role")
}

pub fn sources(dispatcher: &RequestDispatcher) -> Resource<'_> {
    Resource::new(dispatcher, "sources", "source")
}

pub fn users(dispatcher: &RequestDispatcher) -> Resource<'_> {
    Resource::new(dispatcher, "users", "user")
}

pub fn tokens(dispatcher: &RequestDispatcher) -> TokenApi<'_> {
    TokenApi::new(dispatcher)
}

