//! The logged-in user
//!
//! Anonymous callers get `login_required` rather than a not-found document.

use async_trait::async_trait;

use crate::context::Context;
use crate::error::ApiResult;
use crate::resource::Lookup;
use crate::service::{Outcome, Service};

/// `user.current`: the logged-in user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurrentUser;

#[async_trait]
impl Service for CurrentUser {
    fn result_type(&self) -> &'static str {
        "user"
    }

    fn action(&self) -> &'static str {
        "current"
    }

    async fn run(&self, ctx: &Context) -> ApiResult<Option<Outcome>> {
        let user_id = ctx.current_user_id()?;
        let user = ctx.find("user", &Lookup::Id(user_id)).await?;
        Ok(Some(Outcome::Object(user)))
    }
}
