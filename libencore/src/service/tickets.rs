//! Purchased tickets

use super::{Page, ScreenContext};
use crate::api::{ApiResult, Endpoint};
use crate::loader::{ListState, RemoteList};
use crate::normalize::Shape;
use crate::types::Ticket;

pub struct TicketsScreen {
    list: RemoteList<Ticket>,
}

fn endpoint(page: Page) -> Endpoint {
    Endpoint::Tickets {
        page: page.page,
        take: page.take,
    }
}

impl TicketsScreen {
    pub(crate) fn new(ctx: ScreenContext) -> Self {
        let page = ctx.first_page();
        Self {
            list: RemoteList::new(ctx.api, ctx.session, endpoint(page), Shape::List),
        }
    }

    pub fn set_page(&self, page: Page) {
        self.list.set_endpoint(endpoint(page));
    }

    pub async fn load(&self) -> ApiResult<Vec<Ticket>> {
        self.list.load().await
    }

    pub async fn refresh(&self) -> ApiResult<Vec<Ticket>> {
        self.load().await
    }

    pub fn state(&self) -> ListState<Ticket> {
        self.list.state()
    }

    pub fn list(&self) -> &RemoteList<Ticket> {
        &self.list
    }
}
