use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::entities::{NewUser, SessionStatus, SignIn, User};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct SignInParams {
    phone_number: String,
}

pub async fn sign_in(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<SignInParams>,
) -> Result<Json<SignIn>, Error> {
    let sign_in = api.sign_in(params.phone_number).await?;

    Ok(sign_in.into())
}

pub async fn register(
    Extension(api): Extension<DynAPI>,
    Json(user): Json<NewUser>,
) -> Result<Json<User>, Error> {
    let user = api.register(user).await?;

    Ok(user.into())
}

pub async fn sign_out(Extension(api): Extension<DynAPI>) -> Result<Json<()>, Error> {
    api.sign_out().await?;

    Ok(().into())
}

pub async fn status(Extension(api): Extension<DynAPI>) -> Result<Json<SessionStatus>, Error> {
    let status = api.session_status().await?;

    Ok(status.into())
}

pub async fn mark_onboarding_seen(
    Extension(api): Extension<DynAPI>,
) -> Result<Json<SessionStatus>, Error> {
    let status = api.mark_onboarding_seen().await?;

    Ok(status.into())
}
