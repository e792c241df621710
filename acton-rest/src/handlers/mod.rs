//! Action controllers for generated REST endpoints
//!
//! Every endpoint is served by a [`Controller`]: one [`Action`] (list, read,
//! create, update or delete) bound to a resource scope, wrapped in the three
//! hookable phases `fetch`, `write` and `send`.
//!
//! | action | method | endpoint | fetch | write | send |
//! |---|---|---|---|---|---|
//! | list | `GET` | plural | criteria + collection query | none | array + `Content-Range` |
//! | read | `GET` | singular | criteria + single record | none | record |
//! | create | `POST` | plural | none | insert, `Location` | `201` record |
//! | update | `PUT`/`PATCH` | singular | as read | merge + save | record |
//! | delete | `DELETE` | singular | as read | destroy | `{}` |
//!
//! Failures surface as [`ApiError`], which renders a JSON body with the
//! matching status code:
//!
//! ```json
//! {
//!   "message": "Sorting not allowed on given attributes",
//!   "errors": ["username", "invalid"],
//!   "code": "BAD_REQUEST",
//!   "status": 400
//! }
//! ```

mod create;
mod delete;
mod error;
mod list;
mod read;
mod response;
mod traits;
mod update;

pub use create::CreateAction;
pub use delete::DeleteAction;
pub use error::{ApiError, ApiErrorKind, ApiErrorResponse, ApiOperation};
pub use list::ListAction;
pub use read::ReadAction;
pub use response::Reply;
pub use traits::{Action, ActionKind, ActionScope, Controller, Plurality};
pub use update::UpdateAction;

use std::sync::Arc;

/// The built-in action for a kind
pub fn action_for(kind: ActionKind) -> Arc<dyn Action> {
    match kind {
        ActionKind::List => Arc::new(ListAction),
        ActionKind::Read => Arc::new(ReadAction),
        ActionKind::Create => Arc::new(CreateAction),
        ActionKind::Update => Arc::new(UpdateAction),
        ActionKind::Delete => Arc::new(DeleteAction),
    }
}
