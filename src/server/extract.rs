use axum::Form;
use axum::Json;
use axum::extract::FromRequest;
use axum::extract::Request;
use axum::http::header;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::ApiError;
use crate::error::Result;
use crate::error::WorkflowError;

/// Request body accepted as JSON or as an urlencoded form (htmx posts forms).
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::from(WorkflowError::validation(e.body_text())))?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::from(WorkflowError::validation(e.body_text())))?;
            Ok(Self(value))
        }
    }
}

/// A PR number as sent by a client: a JSON number or a form string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PrNumberInput {
    Number(u64),
    Text(String),
}

impl PrNumberInput {
    /// Blank text counts as absent; other non-numeric text is invalid.
    pub fn into_number(self) -> Result<Option<u64>> {
        match self {
            Self::Number(n) => Ok(Some(n)),
            Self::Text(text) => {
                let text = text.trim().trim_start_matches('#');
                if text.is_empty() {
                    return Ok(None);
                }
                text.parse()
                    .map(Some)
                    .map_err(|_| WorkflowError::validation(format!("Invalid PR number: {}", text)))
            }
        }
    }
}
