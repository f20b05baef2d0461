use axum::{
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;

/// What a caller is allowed to do: editors may record and reset, viewers may
/// only query. This is the whole authorization model, a capability check at
/// the API boundary rather than engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Editor,
    #[default]
    Viewer,
}

/// Authenticated caller identity, available to handlers via request extensions.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub name: String,
    pub role: Role,
}

impl CallerIdentity {
    pub fn can_edit(&self) -> bool {
        self.role == Role::Editor
    }
}

#[derive(Serialize)]
struct AuthError {
    success: bool,
    error: String,
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(AuthError {
            success: false,
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub async fn auth_middleware<B>(
    Extension(config): Extension<std::sync::Arc<AuthConfig>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Response {
    if !config.enabled {
        req.extensions_mut().insert(CallerIdentity {
            name: "anonymous".to_string(),
            role: Role::Editor,
        });
        return next.run(req).await;
    }

    let access_key = req
        .headers()
        .get("X-Access-Key")
        .or_else(|| req.headers().get(header::AUTHORIZATION))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.strip_prefix("Bearer ").unwrap_or(s));

    match access_key {
        Some(key) => {
            match config
                .keys
                .iter()
                .find(|entry| entry.key.as_bytes().ct_eq(key.as_bytes()).into())
            {
                Some(entry) => {
                    tracing::debug!(caller = %entry.name, role = ?entry.role, "Authenticated request");
                    req.extensions_mut().insert(CallerIdentity {
                        name: entry.name.clone(),
                        role: entry.role,
                    });
                    next.run(req).await
                }
                None => {
                    tracing::warn!("Invalid access key presented");
                    unauthorized("Invalid access key")
                }
            }
        }
        None => unauthorized(
            "Missing access key. Provide X-Access-Key header or Authorization: Bearer <key>",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_cannot_edit() {
        let viewer = CallerIdentity {
            name: "helper".into(),
            role: Role::Viewer,
        };
        let editor = CallerIdentity {
            name: "owner".into(),
            role: Role::Editor,
        };
        assert!(!viewer.can_edit());
        assert!(editor.can_edit());
    }

    #[test]
    fn role_defaults_to_viewer() {
        assert_eq!(Role::default(), Role::Viewer);
    }
}
