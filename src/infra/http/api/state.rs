use std::sync::Arc;

use crate::application::articles::ArticleMutations;
use crate::application::auth::MutationAuthorizer;
use crate::application::cache_admin::CacheAdmin;
use crate::application::content::ContentQueries;
use crate::application::repos::HealthRepo;
use crate::application::wordpress::WordPressQueries;

#[derive(Clone)]
pub struct ApiState {
    pub content: Arc<ContentQueries>,
    pub wordpress: Arc<WordPressQueries>,
    pub articles: Arc<ArticleMutations>,
    pub cache: Arc<CacheAdmin>,
    pub authorizer: Arc<dyn MutationAuthorizer>,
    /// Bearer token guarding `/api/cache/*` writes and listings.
    pub admin_token: Arc<str>,
    pub db: Arc<dyn HealthRepo>,
}
