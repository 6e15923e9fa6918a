mod reservation_handle;
mod uniwash_handle;

pub use reservation_handle::*;
pub use uniwash_handle::*;

use uniwash_api::models::{Page, ReservationResponse};

use crate::errors::{ApiError, AuthError, ReservationError};
use crate::repositories::{BusinessRepository, ReservationFilter, ReservationListRow};
use crate::services::{Actor, TokenClaims};

/// Resolves the caller's membership in `business_id`.
async fn business_actor(
    business_repository: &BusinessRepository,
    claims: &TokenClaims,
    business_id: i32,
) -> Result<Actor, ApiError> {
    let role = business_repository
        .find_role(claims.sub, business_id)
        .await?
        .ok_or(AuthError::InsufficientPermission)?;

    Ok(Actor::BusinessAgent {
        user_id: claims.sub,
        business_id,
        role,
    })
}

/// Parses a comma separated id list such as `3,7,12`.
fn parse_ids(raw: Option<&str>) -> Result<Vec<i32>, ReservationError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().map_err(|_| ReservationError::InvalidRequest))
        .collect()
}

fn into_page(rows: Vec<ReservationListRow>, total: i64, filter: &ReservationFilter) -> Page<ReservationResponse> {
    Page {
        items: rows.into_iter().map(ReservationListRow::into_response).collect(),
        page: filter.page.max(1),
        page_size: filter.limit() as u32,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_ids(None).unwrap(), Vec::<i32>::new());
        assert_eq!(parse_ids(Some("3, 7,,12")).unwrap(), vec![3, 7, 12]);
        assert!(parse_ids(Some("3,x")).is_err());
    }
}
