//! Favorite concerts

use super::events::Event;
use super::ScreenContext;
use crate::api::{ApiResult, Endpoint};
use crate::error::Result;
use crate::loader::{ListState, RemoteList};
use crate::normalize::Shape;
use crate::types::Favorite;

pub struct FavoritesScreen {
    ctx: ScreenContext,
    list: RemoteList<Favorite>,
}

impl FavoritesScreen {
    pub(crate) fn new(ctx: ScreenContext) -> Self {
        let list = RemoteList::new(
            ctx.api.clone(),
            ctx.session.clone(),
            Endpoint::Favorites,
            Shape::List,
        );
        Self { ctx, list }
    }

    pub async fn load(&self) -> ApiResult<Vec<Favorite>> {
        self.list.load().await
    }

    pub async fn refresh(&self) -> ApiResult<Vec<Favorite>> {
        self.load().await
    }

    pub fn state(&self) -> ListState<Favorite> {
        self.list.state()
    }

    pub fn list(&self) -> &RemoteList<Favorite> {
        &self.list
    }

    /// Delete a favorite record
    ///
    /// The entry disappears from the list right away and comes back at the
    /// same position if the server refuses.
    pub async fn remove(&self, favorite_id: &str) -> Result<()> {
        let mut removed = None;
        self.list.patch(|items| {
            if let Some(index) = items.iter().position(|f| f.id == favorite_id) {
                removed = Some((index, items.remove(index)));
            }
        });

        let token = self.ctx.session.token();
        match self.ctx.api.remove_favorite(token.as_ref(), favorite_id).await {
            Ok(()) => {
                self.ctx.events.emit(Event::FavoriteRemoved {
                    favorite_id: favorite_id.to_string(),
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!(favorite_id, "Failed to remove favorite: {}", e);
                if let Some((index, favorite)) = removed {
                    self.list.patch(|items| {
                        // A reload may already have brought it back
                        if !items.iter().any(|f| f.id == favorite.id) {
                            let index = index.min(items.len());
                            items.insert(index, favorite);
                        }
                    });
                }
                self.ctx.events.alert("Error", "Couldn't remove favorite");
                Err(e.into())
            }
        }
    }
}
