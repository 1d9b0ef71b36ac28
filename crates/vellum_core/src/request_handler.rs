//! Request dispatch for the sync protocol endpoint.
//!
//! Maps each wire [`Request`] onto the corresponding [`Authority`]
//! operation and shapes the result into a [`Response`]. The one
//! translation rule worth noting: a version conflict on a push is a
//! *rejected push response*, not an error, because stale pushes are part
//! of normal operation and the view recovers by re-pulling.

use crate::authority::Authority;
use crate::error::{AuthorityError, Result};
use crate::fs::AsyncFileSystem;
use crate::protocol::{Request, Response};
use crate::subscription::ViewId;
use crate::update::Update;

impl<FS: AsyncFileSystem> Authority<FS> {
    /// Execute one protocol request on behalf of `view`.
    ///
    /// `view` matters only for `PullUpdates` (it keys the long-poll
    /// supersede rule); other requests ignore it.
    pub async fn execute(&self, view: ViewId, request: Request) -> Result<Response> {
        match request {
            Request::GetDocument { path } => {
                Ok(Response::Document(self.get_document(&path).await?))
            }

            Request::PushUpdates {
                path,
                version,
                edits,
            } => match self.push_updates(&path, Update { version, edits }) {
                Ok(version) => Ok(Response::PushResult {
                    accepted: true,
                    version,
                }),
                Err(AuthorityError::VersionConflict { expected, .. }) => {
                    Ok(Response::PushResult {
                        accepted: false,
                        // The head the view must rebase onto.
                        version: expected - 1,
                    })
                }
                Err(err) => Err(err),
            },

            Request::PullUpdates { path, version } => Ok(Response::PullResult {
                updates: self.pull_updates(view, &path, version).await?,
            }),

            Request::GetFileModificationStatus => Ok(Response::ModificationStatus {
                paths: self.modification_status(),
            }),

            Request::RetrieveTabConfig { window } => {
                Ok(Response::TabConfig(self.tab_config(window)?))
            }
        }
    }
}
