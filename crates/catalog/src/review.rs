use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, ProductId, ReviewId, UserId};

/// Customer review of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product: ProductId,
    pub user: UserId,
    /// Rating, 1..=5.
    pub stars: u8,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        id: ReviewId,
        product: ProductId,
        user: UserId,
        stars: u8,
        text: Option<String>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !(1..=5).contains(&stars) {
            return Err(DomainError::validation("stars must be between 1 and 5"));
        }
        Ok(Self {
            id,
            product,
            user,
            stars,
            text,
            created_at,
        })
    }
}

impl Entity for Review {
    type Id = ReviewId;
    const NAME: &'static str = "review";

    fn id(&self) -> ReviewId {
        self.id
    }
}

/// Mean star rating; `0.0` for a product nobody has reviewed yet.
pub fn avg_stars<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> f64 {
    let (sum, count) = reviews
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r.stars), count + 1));
    if count == 0 {
        return 0.0;
    }
    sum as f64 / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(stars: u8) -> Review {
        Review::new(ReviewId::new(), ProductId::new(), UserId::new(), stars, None, Utc::now())
            .unwrap()
    }

    #[test]
    fn no_reviews_means_zero_stars() {
        assert_eq!(avg_stars(&[]), 0.0);
    }

    #[test]
    fn averages_ratings() {
        let reviews = vec![review(5), review(4), review(3)];
        assert_eq!(avg_stars(&reviews), 4.0);
    }

    #[test]
    fn rejects_out_of_range_stars() {
        for stars in [0u8, 6] {
            assert!(
                Review::new(ReviewId::new(), ProductId::new(), UserId::new(), stars, None, Utc::now())
                    .is_err()
            );
        }
    }
}
