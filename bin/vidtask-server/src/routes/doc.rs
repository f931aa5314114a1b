use utoipa::OpenApi;

use crate::routes::{api, health};

#[derive(OpenApi)]
#[openapi(info(
    title = "vidtask-server",
    description = "Simulated video watermark-removal task API"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.info.version = env!("CARGO_PKG_VERSION").to_owned();
    root.merge(health::HealthApi::openapi());
    root.merge(api::api_docs());
    root
}
