pub mod directors;
pub mod feed;
pub mod ranking;
pub mod recommendations;
pub mod reviews;
pub mod social;

pub use feed::{spawn_feed_writer, FeedPublisher};

#[cfg(test)]
pub(crate) mod testutil {
    use std::time::Duration;

    use chrono::NaiveDate;

    use crate::db::store::{FilmStore, UserStore};
    use crate::models::{Film, NewFilm, NewUser, User};

    pub async fn user(store: &dyn crate::db::Storage, n: u32) -> User {
        store
            .create_user(NewUser {
                email: format!("user{}@example.com", n),
                login: format!("user{}", n),
                name: format!("User {}", n),
                birthday: None,
            })
            .await
            .unwrap()
    }

    pub async fn film(store: &dyn crate::db::Storage, name: &str) -> Film {
        store
            .create_film(NewFilm {
                name: name.to_string(),
                description: None,
                release_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                duration: 100,
                genre_ids: vec![],
                director_ids: vec![],
            })
            .await
            .unwrap()
    }

    /// Gives the asynchronous feed writer time to drain.
    pub async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
