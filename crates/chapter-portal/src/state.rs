use std::sync::Arc;

use crate::config::Config;
use crate::services::blob::BlobClient;
use crate::services::content::ContentService;
use crate::services::documents::DocumentService;
use crate::services::submissions::SubmissionService;
use crate::services::users::UserService;
use crate::services::whitelist::WhitelistService;
use crate::store::PortalStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn PortalStore>,
    pub submissions: SubmissionService,
    pub documents: DocumentService,
    pub users: UserService,
    pub whitelist: WhitelistService,
    pub content: ContentService,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn PortalStore>) -> Self {
        let blob = BlobClient::new(&config.blob);
        let whitelist = WhitelistService::new(store.clone());
        Self {
            submissions: SubmissionService::new(store.clone()),
            documents: DocumentService::new(store.clone(), blob, config.max_upload_bytes),
            users: UserService::new(store.clone(), whitelist.clone()),
            whitelist,
            content: ContentService::new(store.clone()),
            config: Arc::new(config),
            store,
        }
    }
}
