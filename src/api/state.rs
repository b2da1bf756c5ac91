use crate::auth::AuthState;

/// State shared with every handler through an `Extension<Arc<ApiState>>`.
#[derive(Debug, Clone)]
pub struct ApiState {
    auth: AuthState,
    app_env: String,
}

impl ApiState {
    #[must_use]
    pub fn new(auth: AuthState, app_env: impl Into<String>) -> Self {
        Self {
            auth,
            app_env: app_env.into(),
        }
    }

    #[must_use]
    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    /// Deployment environment name reported in runtime metadata.
    #[must_use]
    pub fn app_env(&self) -> &str {
        &self.app_env
    }
}
