//! Latest posts feed

use super::{Page, ScreenContext};
use crate::api::{ApiResult, Endpoint};
use crate::loader::{ListState, RemoteList};
use crate::normalize::Shape;
use crate::types::Post;

pub struct PostsScreen {
    list: RemoteList<Post>,
}

fn endpoint(page: Page) -> Endpoint {
    Endpoint::PostsPaged {
        page: page.page,
        take: page.take,
    }
}

impl PostsScreen {
    pub(crate) fn new(ctx: ScreenContext) -> Self {
        let page = ctx.first_page();
        Self {
            list: RemoteList::new(ctx.api, ctx.session, endpoint(page), Shape::List),
        }
    }

    pub fn set_page(&self, page: Page) {
        self.list.set_endpoint(endpoint(page));
    }

    pub async fn load(&self) -> ApiResult<Vec<Post>> {
        self.list.load().await
    }

    /// Pull-to-refresh
    pub async fn refresh(&self) -> ApiResult<Vec<Post>> {
        self.load().await
    }

    pub fn state(&self) -> ListState<Post> {
        self.list.state()
    }

    pub fn list(&self) -> &RemoteList<Post> {
        &self.list
    }
}
