use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use error_stack::ResultExt;
use google_sheets4::oauth2::{
    self, authenticator::Authenticator, authenticator_delegate::InstalledFlowDelegate,
    ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod,
};
use thiserror::Error;
use tracing::{info, instrument};

use super::credential_store::{CredentialStorage, CredentialStore};
use super::http_client::{HttpClient, HttpsConnector};

pub const SPREADSHEETS_READONLY: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Could not read OAuth client secret")]
    ClientSecret,
    #[error("Could not create an authenticator")]
    Authenticator,
}

#[instrument]
pub async fn read_client_secret(path: &Path) -> error_stack::Result<ApplicationSecret, AuthError> {
    oauth2::read_application_secret(path)
        .await
        .change_context(AuthError::ClientSecret)
        .attach_printable_lazy(|| {
            format!(
                "Expected an installed-application client secret at '{}'. It is only needed until a credential has been saved.",
                path.display()
            )
        })
}

/// Surfaces the consent URL through the log. The code comes back on the local
/// redirect listener, so nothing is read from stdin.
pub struct LogFlowDelegate;

impl InstalledFlowDelegate for LogFlowDelegate {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        _need_code: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            info!("Authorize access to the spreadsheet by opening: {url}");
            eprintln!("Open this URL in your browser to authorize access:\n{url}");
            Ok(String::new())
        })
    }
}

/// Builds the installed-flow authenticator backed by `store`.
///
/// A stored, unexpired credential is used as is, an expired one with a refresh
/// token is refreshed, and only otherwise the browser consent flow runs (with a
/// redirect listener on an ephemeral local port). New credentials are saved
/// back to `store`.
pub async fn auth(
    secret: ApplicationSecret,
    store: Arc<dyn CredentialStore>,
    client: HttpClient,
    delegate: Box<dyn InstalledFlowDelegate>,
) -> error_stack::Result<Authenticator<HttpsConnector>, AuthError> {
    InstalledFlowAuthenticator::with_client(
        secret,
        InstalledFlowReturnMethod::HTTPRedirect,
        client,
    )
    .with_storage(Box::new(CredentialStorage(store)))
    .flow_delegate(delegate)
    .build()
    .await
    .change_context(AuthError::Authenticator)
}
