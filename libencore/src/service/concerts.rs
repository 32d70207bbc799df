//! Concert catalogue: listing, search, buying tickets and favorites

use std::collections::HashSet;
use std::sync::Mutex;

use super::events::Event;
use super::{Page, ScreenContext};
use crate::api::{ApiResult, Endpoint};
use crate::config::SearchMode;
use crate::error::{ApiError, EncoreError, Result};
use crate::loader::{ListState, RemoteList};
use crate::normalize::Shape;
use crate::types::{Concert, Favorite};

pub struct ConcertsScreen {
    ctx: ScreenContext,
    list: RemoteList<Concert>,
    page: Mutex<Page>,
}

fn listing(page: Page, name: Option<String>) -> Endpoint {
    Endpoint::ConcertsPaged {
        page: page.page,
        take: page.take,
        name,
    }
}

/// Flag every concert that appears among `favorites`
pub fn mark_favorites(mut concerts: Vec<Concert>, favorites: &[Favorite]) -> Vec<Concert> {
    let ids: HashSet<&str> = favorites.iter().map(Favorite::concert_id).collect();
    for concert in &mut concerts {
        concert.is_favorite = concert.is_favorite || ids.contains(concert.id.as_str());
    }
    concerts
}

impl ConcertsScreen {
    pub(crate) fn new(ctx: ScreenContext) -> Self {
        let page = ctx.first_page();
        let list = RemoteList::new(
            ctx.api.clone(),
            ctx.session.clone(),
            listing(page, None),
            Shape::List,
        );
        Self {
            ctx,
            list,
            page: Mutex::new(page),
        }
    }

    fn current_page(&self) -> Page {
        *self.page.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Switch to another page of the unfiltered listing
    pub fn set_page(&self, page: Page) {
        *self.page.lock().unwrap_or_else(|p| p.into_inner()) = page;
        self.list.set_endpoint(listing(page, None));
    }

    /// Load the current listing
    ///
    /// The unfiltered listing is fetched together with the favorites, and
    /// the two must both succeed. Search results are fetched alone.
    pub async fn load(&self) -> ApiResult<Vec<Concert>> {
        let api = self.ctx.api.clone();
        self.list
            .load_with(|endpoint, token| async move {
                let token = token.as_ref();
                match endpoint {
                    Endpoint::ConcertsPaged {
                        page,
                        take,
                        name: None,
                    } => {
                        let (concerts, favorites) = futures::try_join!(
                            api.concerts(token, page, take, None),
                            api.favorites(token),
                        )?;
                        Ok(mark_favorites(concerts, &favorites))
                    }
                    Endpoint::ConcertsPaged { page, take, name } => {
                        api.concerts(token, page, take, name.as_deref()).await
                    }
                    Endpoint::ConcertByName(name) => api.concert_by_name(token, &name).await,
                    other => api.fetch(other, Shape::List, token).await,
                }
            })
            .await
    }

    pub async fn refresh(&self) -> ApiResult<Vec<Concert>> {
        self.load().await
    }

    /// Search by name, replacing the shown list
    ///
    /// A blank term goes back to the unfiltered listing.
    pub async fn search(&self, term: &str) -> ApiResult<Vec<Concert>> {
        let term = term.trim();
        let page = self.current_page();
        let endpoint = if term.is_empty() {
            listing(page, None)
        } else {
            match self.ctx.config.api.search_mode {
                SearchMode::Paged => listing(page, Some(term.to_string())),
                SearchMode::ByName => Endpoint::ConcertByName(term.to_string()),
            }
        };
        self.list.set_endpoint(endpoint);

        let result = self.load().await;
        if let Err(e) = &result {
            if !term.is_empty() && !matches!(e, ApiError::Cancelled) {
                self.ctx.events.alert("Error", "Couldn't perform search");
            }
        }
        result
    }

    pub fn state(&self) -> ListState<Concert> {
        self.list.state()
    }

    pub fn list(&self) -> &RemoteList<Concert> {
        &self.list
    }

    fn find(&self, concert_id: &str) -> Option<Concert> {
        self.list
            .items()
            .and_then(|items| items.into_iter().find(|c| c.id == concert_id))
    }

    /// Buy one ticket, then reload the list
    ///
    /// A concert shown as sold out is refused without contacting the server.
    pub async fn buy_ticket(&self, concert_id: &str) -> Result<()> {
        if let Some(concert) = self.find(concert_id) {
            if concert.is_sold_out() {
                return Err(EncoreError::InvalidInput(format!(
                    "'{}' is sold out",
                    concert.name
                )));
            }
        }

        let token = self.ctx.session.token();
        if let Err(e) = self.ctx.api.buy_ticket(token.as_ref(), concert_id).await {
            tracing::error!(concert_id, "Failed to buy ticket: {}", e);
            self.ctx.events.alert("Error", "Couldn't buy ticket");
            return Err(e.into());
        }

        tracing::info!(concert_id, "Ticket purchased");
        self.ctx.events.emit(Event::TicketPurchased {
            concert_id: concert_id.to_string(),
        });
        self.ctx.events.alert("Success", "Ticket purchased!");

        // The reload outcome lands in the list state; the purchase itself stands
        let _ = self.load().await;
        Ok(())
    }

    /// Flip the favorite flag of a listed concert
    ///
    /// The flag changes immediately; `POST /Favorite/{id}` adds and
    /// `DELETE /Favorite/{id}` removes. A failed request puts the flag back.
    /// Returns the new flag.
    pub async fn toggle_favorite(&self, concert_id: &str) -> Result<bool> {
        let was_favorite = self
            .find(concert_id)
            .map(|c| c.is_favorite)
            .ok_or_else(|| {
                EncoreError::InvalidInput(format!("concert {} is not in the list", concert_id))
            })?;

        self.set_favorite_flag(concert_id, !was_favorite);

        let token = self.ctx.session.token();
        let result = if was_favorite {
            self.ctx.api.delete_favorite(token.as_ref(), concert_id).await
        } else {
            self.ctx.api.add_favorite(token.as_ref(), concert_id).await
        };

        match result {
            Ok(()) => {
                self.ctx.events.emit(Event::FavoriteChanged {
                    concert_id: concert_id.to_string(),
                    is_favorite: !was_favorite,
                });
                Ok(!was_favorite)
            }
            Err(e) => {
                tracing::error!(concert_id, "Failed to update favorite: {}", e);
                self.set_favorite_flag(concert_id, was_favorite);
                self.ctx.events.alert("Error", "Couldn't update favorites");
                Err(e.into())
            }
        }
    }

    fn set_favorite_flag(&self, concert_id: &str, is_favorite: bool) {
        self.list.patch(|items| {
            if let Some(concert) = items.iter_mut().find(|c| c.id == concert_id) {
                concert.is_favorite = is_favorite;
            }
        });
    }
}
