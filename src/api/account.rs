//! Account endpoints: registration, login, favorites, saved locations and
//! search history. Everything past login needs a stored session.

use reqwest::Method;

use super::client::{decode, ensure_success};
use super::{ApiClient, ApiError};
use crate::auth::TokenPair;
use crate::models::{
    Favorite, FavoriteStatus, LocationUpdate, NewFavorite, NewLocation, NewUser, SavedLocation,
    SearchRecord, User, UserProfile,
};

/// What [`ApiClient::toggle_favorite`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum FavoriteToggle {
    Added(Favorite),
    Removed { favorite_id: i64 },
}

/// Species codes end up in URL paths; keep them to what eBird issues.
fn check_species_code(code: &str) -> Result<&str, ApiError> {
    let code = code.trim();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::Invalid(format!("invalid species code: {code:?}")));
    }
    Ok(code)
}

impl ApiClient {
    pub async fn register(&self, user: &NewUser) -> Result<User, ApiError> {
        user.validate().map_err(ApiError::invalid)?;
        let resp = self
            .anonymous(Method::POST, "/auth/register")
            .json(user)
            .send()
            .await?;
        decode(ensure_success(resp).await?).await
    }

    /// OAuth2 password form; the email goes in the `username` field.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        let resp = self
            .anonymous(Method::POST, "/auth/login")
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;
        decode(ensure_success(resp).await?).await
    }

    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.get_json("/auth/me", &[]).await
    }

    /// Newest first.
    pub async fn favorites(&self) -> Result<Vec<Favorite>, ApiError> {
        self.get_json("/auth/favorites", &[]).await
    }

    pub async fn add_favorite(&self, favorite: &NewFavorite) -> Result<Favorite, ApiError> {
        favorite.validate().map_err(ApiError::invalid)?;
        check_species_code(&favorite.species_code)?;
        self.send_json(Method::POST, "/auth/favorites", favorite)
            .await
    }

    pub async fn check_favorite(&self, species_code: &str) -> Result<FavoriteStatus, ApiError> {
        let code = check_species_code(species_code)?;
        self.get_json(&format!("/auth/favorites/check/{code}"), &[])
            .await
    }

    pub async fn remove_favorite(&self, favorite_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/auth/favorites/{favorite_id}")).await
    }

    /// Remove the species if it is a favorite, add it otherwise.
    pub async fn toggle_favorite(&self, favorite: &NewFavorite) -> Result<FavoriteToggle, ApiError> {
        let status = self.check_favorite(&favorite.species_code).await?;
        match (status.is_favorited, status.favorite_id) {
            (true, Some(favorite_id)) => {
                self.remove_favorite(favorite_id).await?;
                Ok(FavoriteToggle::Removed { favorite_id })
            }
            _ => Ok(FavoriteToggle::Added(self.add_favorite(favorite).await?)),
        }
    }

    /// Newest first.
    pub async fn search_history(&self, limit: u32) -> Result<Vec<SearchRecord>, ApiError> {
        self.get_json("/auth/searches", &[("limit", limit.max(1).to_string())])
            .await
    }

    pub async fn locations(&self) -> Result<Vec<SavedLocation>, ApiError> {
        self.get_json("/auth/locations", &[]).await
    }

    /// The server geocodes the ZIP or city and fills in the coordinates.
    pub async fn add_location(&self, location: &NewLocation) -> Result<SavedLocation, ApiError> {
        location.validate().map_err(ApiError::invalid)?;
        let location = NewLocation {
            name: location.name.trim().to_string(),
            location_value: location.location_value.trim().to_string(),
            ..location.clone()
        };
        self.send_json(Method::POST, "/auth/locations", &location)
            .await
    }

    pub async fn update_location(
        &self,
        location_id: i64,
        update: &LocationUpdate,
    ) -> Result<SavedLocation, ApiError> {
        update.validate().map_err(ApiError::invalid)?;
        let update = LocationUpdate {
            name: update.name.as_deref().map(|n| n.trim().to_string()),
            ..update.clone()
        };
        self.send_json(
            Method::PATCH,
            &format!("/auth/locations/{location_id}"),
            &update,
        )
        .await
    }

    /// Mark one location as the default; the server unsets the others.
    pub async fn set_default_location(&self, location_id: i64) -> Result<SavedLocation, ApiError> {
        let update = LocationUpdate {
            name: None,
            is_default: Some(true),
        };
        self.update_location(location_id, &update).await
    }

    pub async fn remove_location(&self, location_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/auth/locations/{location_id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_codes() {
        assert_eq!(check_species_code(" baleag ").unwrap(), "baleag");
        assert!(check_species_code("snoowl1").is_ok());
        assert!(check_species_code("").is_err());
        assert!(check_species_code("../me").is_err());
        assert!(check_species_code("bald eagle").is_err());
    }
}
