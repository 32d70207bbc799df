//! Current user profile

use super::events::Event;
use super::ScreenContext;
use crate::api::{ApiResult, Endpoint};
use crate::error::Result;
use crate::loader::{ListState, RemoteList};
use crate::normalize::Shape;
use crate::types::UserProfile;

pub struct ProfileScreen {
    ctx: ScreenContext,
    list: RemoteList<UserProfile>,
}

impl ProfileScreen {
    pub(crate) fn new(ctx: ScreenContext) -> Self {
        let list = RemoteList::new(
            ctx.api.clone(),
            ctx.session.clone(),
            Endpoint::Me,
            Shape::Single,
        );
        Self { ctx, list }
    }

    pub async fn load(&self) -> ApiResult<Option<UserProfile>> {
        Ok(self.list.load().await?.into_iter().next())
    }

    pub async fn refresh(&self) -> ApiResult<Option<UserProfile>> {
        self.load().await
    }

    pub fn state(&self) -> ListState<UserProfile> {
        self.list.state()
    }

    /// The loaded profile, if any
    pub fn profile(&self) -> Option<UserProfile> {
        self.list.items().and_then(|items| items.into_iter().next())
    }

    pub async fn log_out(&self) -> Result<()> {
        self.ctx.session.log_out().await?;
        self.ctx.events.emit(Event::SessionChanged {
            authenticated: false,
        });
        Ok(())
    }
}
