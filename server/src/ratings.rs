use dashmap::DashMap;
use shared::PlayerId;

/// Player rating lookup owned by the profile service.
pub trait RatingLookup: Send + Sync {
    fn rating(&self, player_id: PlayerId) -> u32;
}

/// Ratings held in memory; unknown players get the configured default.
pub struct InMemoryRatings {
    ratings: DashMap<PlayerId, u32>,
    default_rating: u32,
}

impl InMemoryRatings {
    pub fn new(default_rating: u32) -> Self {
        Self {
            ratings: DashMap::new(),
            default_rating,
        }
    }

    #[cfg(test)]
    pub fn set(&self, player_id: PlayerId, rating: u32) {
        self.ratings.insert(player_id, rating);
    }
}

impl RatingLookup for InMemoryRatings {
    fn rating(&self, player_id: PlayerId) -> u32 {
        self.ratings
            .get(&player_id)
            .map_or(self.default_rating, |r| *r)
    }
}
