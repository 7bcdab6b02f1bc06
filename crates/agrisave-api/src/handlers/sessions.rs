//! Farmer login session handlers.

use std::collections::BTreeMap;

use agrisave_models::{FarmerProfile, FarmerSession, Language};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSessionRequest {
    /// New language code (`en` or `hi`)
    #[serde(default)]
    pub language: Option<String>,
    /// Switch to the other language
    #[serde(default)]
    pub toggle_language: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: FarmerSession,
    pub greeting: String,
    pub labels: BTreeMap<&'static str, &'static str>,
}

impl From<FarmerSession> for SessionResponse {
    fn from(session: FarmerSession) -> Self {
        Self {
            greeting: session.greeting(),
            labels: session.language.labels().into_iter().collect(),
            session,
        }
    }
}

fn parse_language(language: Option<&str>) -> ApiResult<Language> {
    match language {
        Some(code) => Ok(code.parse::<Language>()?),
        None => Ok(Language::default()),
    }
}

/// Log in with a name and farm location.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let profile = FarmerProfile::new(&body.name, &body.location)?;
    let language = parse_language(body.language.as_deref())?;
    let session = state.sessions.create(profile, language).await;
    Ok((StatusCode::CREATED, Json(session.into())))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("session {}", id)))?;
    Ok(Json(session.into()))
}

/// Change the session language.
pub async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSessionRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let current = state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("session {}", id)))?;

    let language = if body.toggle_language {
        current.language.toggled()
    } else if let Some(code) = body.language.as_deref() {
        parse_language(Some(code))?
    } else {
        current.language
    };

    let session = state
        .sessions
        .set_language(id, language)
        .await
        .ok_or_else(|| ApiError::not_found(format!("session {}", id)))?;
    Ok(Json(session.into()))
}

/// Log out.
pub async fn logout(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("session {}", id)))
    }
}
