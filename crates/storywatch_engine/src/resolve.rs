use std::collections::HashSet;

use storywatch_core::{ErrorKind, IdentityCache, UserId};
use storywatch_logging::{watch_debug, watch_info};
use thiserror::Error;

use crate::client::{ClientError, StoryClient};
use crate::pacing::Pacer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub account: String,
    pub user_id: UserId,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("lookup of @{account} failed: {source}")]
    Lookup { account: String, source: ClientError },
    #[error("platform returned a non-numeric id {raw:?} for @{account}")]
    InvalidId { account: String, raw: String },
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Resolution
    }
}

/// Map account names to user ids, cache first.
///
/// Uncached names are looked up one at a time, stored in `cache`, and followed
/// by a politeness pause. The first failed lookup aborts the pass; ids resolved
/// before it stay in the cache. Repeated names are resolved once and reported
/// at their first position.
pub async fn resolve_targets(
    client: &dyn StoryClient,
    accounts: &[String],
    cache: &mut IdentityCache,
    pacer: &mut Pacer,
) -> Result<Vec<ResolvedTarget>, ResolveError> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(accounts.len());

    for account in accounts {
        if !seen.insert(account.as_str()) {
            continue;
        }
        if let Some(user_id) = cache.get(account) {
            watch_debug!("@{} resolved from cache: {}", account, user_id);
            resolved.push(ResolvedTarget {
                account: account.clone(),
                user_id: *user_id,
            });
            continue;
        }

        pacer.acquire().await;
        let raw = client
            .user_id(account)
            .await
            .map_err(|source| ResolveError::Lookup {
                account: account.clone(),
                source,
            })?;
        let user_id = parse_user_id(&raw).ok_or_else(|| ResolveError::InvalidId {
            account: account.clone(),
            raw: raw.clone(),
        })?;
        cache.insert(account.clone(), user_id);
        watch_info!("@{} resolved to {}", account, user_id);
        resolved.push(ResolvedTarget {
            account: account.clone(),
            user_id,
        });
        pacer.pause().await;
    }

    Ok(resolved)
}

fn parse_user_id(raw: &str) -> Option<UserId> {
    raw.trim().parse().ok()
}
