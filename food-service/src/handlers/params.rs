//! Request parameters shared by every endpoint
//!
//! Optional parameters deserialize to `Option`; a blank value counts as
//! absent. List-valued parameters are comma separated (`sortBy=price,name`).
//! `sortDir` keeps blank entries so each direction stays paired with the
//! `sortBy` field at the same position.

use std::fmt::Display;
use std::str::FromStr;

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use super::ApiError;
use crate::config::PagingConfig;
use crate::query::{build_sort, EntityKind, PageRequest, QueryResult, SortSpec};

/// `Query` extractor whose rejection is a JSON [`ApiError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// `Json` body extractor whose rejection is a JSON [`ApiError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// `page` and `size`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub size: Option<i64>,
}

impl PageParams {
    /// Apply the configured defaults; sizes above the maximum are clamped
    ///
    /// # Errors
    ///
    /// `InvalidPage` for a negative index or a size below one.
    pub fn resolve(&self, paging: &PagingConfig) -> QueryResult<PageRequest> {
        let size = self
            .size
            .unwrap_or(paging.default_size)
            .min(paging.max_size);
        PageRequest::new(self.page.unwrap_or(0), size)
    }
}

/// `sortBy` and `sortDir`, paired by position
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortParams {
    #[serde(default, deserialize_with = "comma_separated")]
    pub sort_by: Vec<String>,
    #[serde(default, deserialize_with = "positional_list")]
    pub sort_dir: Vec<String>,
}

impl SortParams {
    /// Build the sort for `kind`; no `sortBy` means `id` ascending
    ///
    /// # Errors
    ///
    /// `UnknownSortField` for undeclared or list-valued fields.
    pub fn resolve(&self, kind: EntityKind) -> QueryResult<SortSpec> {
        build_sort(kind, self.sort_by.as_slice(), self.sort_dir.as_slice())
    }
}

/// Parse an optional scalar, treating a blank value as absent
pub(crate) fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Split a comma separated list, dropping blank entries
pub(crate) fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|raw| split_list(&raw))
        .unwrap_or_default())
}

/// Like [`comma_separated`], but keeps "present and empty" apart from "absent"
pub(crate) fn optional_comma_separated<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(|raw| split_list(&raw)))
}

/// Split a comma separated list, keeping blank entries in place
///
/// A wholly blank value is an empty list.
pub(crate) fn positional_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => {
            raw.split(',').map(|item| item.trim().to_string()).collect()
        }
        _ => Vec::new(),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reject a missing required parameter
pub(crate) fn required<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::bad_request(format!("Query parameter '{name}' is required")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryErrorKind, SortDirection};

    fn parse<T: DeserializeOwned>(query: &str) -> T {
        let uri: axum::http::Uri = format!("/?{query}").parse().unwrap();
        Query::<T>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_page_defaults_and_clamp() {
        let paging = PagingConfig::default();

        let page = parse::<PageParams>("").resolve(&paging).unwrap();
        assert_eq!((page.index(), page.size()), (0, 10));

        let page = parse::<PageParams>("page=2&size=500").resolve(&paging).unwrap();
        assert_eq!((page.index(), page.size()), (2, 100));

        let page = parse::<PageParams>("page=&size=").resolve(&paging).unwrap();
        assert_eq!((page.index(), page.size()), (0, 10));
    }

    #[test]
    fn test_negative_page_is_invalid() {
        let err = parse::<PageParams>("page=-1")
            .resolve(&PagingConfig::default())
            .unwrap_err();
        assert_eq!(err.kind, QueryErrorKind::InvalidPage);
    }

    #[test]
    fn test_sort_params_pair_by_position() {
        let params: SortParams = parse("sortBy=price,%20name&sortDir=desc");
        assert_eq!(params.sort_by, vec!["price", "name"]);

        let sort = params.resolve(EntityKind::Product).unwrap();
        let keys: Vec<_> = sort
            .keys()
            .iter()
            .map(|k| (k.field.name, k.direction))
            .collect();
        assert_eq!(
            keys,
            vec![("price", SortDirection::Desc), ("name", SortDirection::Asc)]
        );
    }

    #[test]
    fn test_blank_direction_keeps_its_position() {
        let params: SortParams = parse("sortBy=price,name&sortDir=,desc");
        assert_eq!(params.sort_dir, vec!["", "desc"]);

        let sort = params.resolve(EntityKind::Product).unwrap();
        let keys: Vec<_> = sort
            .keys()
            .iter()
            .map(|k| (k.field.name, k.direction))
            .collect();
        assert_eq!(
            keys,
            vec![("price", SortDirection::Desc), ("name", SortDirection::Desc)]
        );
    }

    #[test]
    fn test_blank_sort_dir_is_empty() {
        assert!(parse::<SortParams>("sortDir=").sort_dir.is_empty());
        assert!(parse::<SortParams>("sortDir=%20").sort_dir.is_empty());
    }

    #[test]
    fn test_missing_sort_defaults_to_id() {
        let sort = parse::<SortParams>("").resolve(EntityKind::User).unwrap();
        assert_eq!(sort.to_string(), "id asc");
    }

    #[derive(Debug, Deserialize)]
    struct Tags {
        #[serde(default, deserialize_with = "optional_comma_separated")]
        tags: Option<Vec<String>>,
    }

    #[test]
    fn test_optional_list_keeps_empty_apart_from_absent() {
        assert_eq!(parse::<Tags>("").tags, None);
        assert_eq!(parse::<Tags>("tags=").tags, Some(vec![]));
        assert_eq!(
            parse::<Tags>("tags=Vegan,,Dessert").tags,
            Some(vec!["Vegan".to_string(), "Dessert".to_string()])
        );
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let uri: axum::http::Uri = "/?page=two".parse().unwrap();
        assert!(Query::<PageParams>::try_from_uri(&uri).is_err());
    }

    #[test]
    fn test_required() {
        assert_eq!(required(Some(3), "size").unwrap(), 3);
        let err = required::<i64>(None, "name").unwrap_err();
        assert_eq!(err.message, "Query parameter 'name' is required");
    }
}
