use tracing::info;

use crate::App;
use crate::error::Result;

impl App {
    /// Replace the live credential. Whitespace around the token is dropped.
    pub fn authenticate(&self, token: &str) -> Result<()> {
        self.credentials.authenticate(token)?;
        info!(length = token.trim().len(), "Token received");
        Ok(())
    }

    pub fn logout(&self) {
        self.credentials.logout();
        info!("Credential cleared");
    }

    /// Check the live credential against the remote and return its login.
    pub async fn test_token(&self) -> Result<String> {
        let session = self.session()?;
        self.gh.current_user(&session.credential).await
    }
}
