use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A registered user.
///
/// Only `id` matters to the graph and feed logic; the display attributes
/// are carried for API completeness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Surrogate key assigned by the store on creation; never reused.
    pub id: i64,
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: Option<NaiveDate>,
}

/// A film in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Film {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub release_date: NaiveDate,
    /// Runtime in minutes.
    pub duration: i32,
    /// Reference ids into the static genre table (not managed here).
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    /// Directors credited on the film.
    #[serde(default)]
    pub director_ids: Vec<i64>,
}

impl Film {
    /// Release year, used by the popularity year filter.
    pub fn year(&self) -> i32 {
        use chrono::Datelike;
        self.release_date.year()
    }
}

/// Payload for creating a user; the store assigns the id.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: Option<NaiveDate>,
}

/// Payload for creating a film.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFilm {
    pub name: String,
    pub description: Option<String>,
    pub release_date: NaiveDate,
    pub duration: i32,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    #[serde(default)]
    pub director_ids: Vec<i64>,
}

/// A film director. Directors exist independently of films; the linkage
/// lives on the film record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Director {
    pub id: i64,
    pub name: String,
}

/// Payload for creating a director.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDirector {
    pub name: String,
}

/// Payload for creating a review.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub film_id: i64,
    pub user_id: i64,
    pub content: String,
    pub is_positive: bool,
}

/// A film review. The core treats the text as opaque; only
/// `(id, film_id, user_id)` participate in feed events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: i64,
    pub film_id: i64,
    pub user_id: i64,
    pub content: String,
    pub is_positive: bool,
}

/// Kind of action recorded in the activity feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Like,
    Friend,
    Review,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Like => "LIKE",
            EventType::Friend => "FRIEND",
            EventType::Review => "REVIEW",
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIKE" => Ok(EventType::Like),
            "FRIEND" => Ok(EventType::Friend),
            "REVIEW" => Ok(EventType::Review),
            other => Err(format!("unknown event type: {}", other)),
        }
    }
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Add,
    Remove,
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "ADD",
            Operation::Remove => "REMOVE",
            Operation::Update => "UPDATE",
        }
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADD" => Ok(Operation::Add),
            "REMOVE" => Ok(Operation::Remove),
            "UPDATE" => Ok(Operation::Update),
            other => Err(format!("unknown operation: {}", other)),
        }
    }
}

/// One entry in a user's activity feed. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedEvent {
    /// Assigned by the feed store on append, monotonically increasing.
    pub event_id: i64,
    /// The actor: the user whose feed this event belongs to.
    pub user_id: i64,
    /// The film, friend, or review the action touched.
    pub entity_id: i64,
    pub event_type: EventType,
    pub operation: Operation,
    pub timestamp: DateTime<Utc>,
}

impl FeedEvent {
    /// Builds an event at the current instant. The store overwrites
    /// `event_id` when the event is appended.
    pub fn now(user_id: i64, entity_id: i64, event_type: EventType, operation: Operation) -> Self {
        Self {
            event_id: 0,
            user_id,
            entity_id,
            event_type,
            operation,
            timestamp: Utc::now(),
        }
    }
}
